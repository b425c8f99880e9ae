mod common;

use agent_studio::models::{Agent, Attachment, ProcessingState};
use agent_studio::session::navigator::{fields, next, prev};
use agent_studio::session::*;
use agent_studio::store::StoreError;
use common::{agent, FakeStore};
use speculate2::speculate;
use tokio_test::block_on;

fn file(name: &str) -> Attachment {
    Attachment::new(name, format!("contents of {}", name).into_bytes())
}

speculate! {
    describe "navigator" {
        it "orders creation fields with the name first" {
            assert_eq!(
                fields(false),
                &[
                    FieldKey::Name,
                    FieldKey::Instructions,
                    FieldKey::WelcomeMessage,
                    FieldKey::SuggestedPrompts,
                    FieldKey::Files,
                ]
            );
        }

        it "drops the name once the agent exists" {
            assert_eq!(fields(true).first(), Some(&FieldKey::Instructions));
            assert!(!fields(true).contains(&FieldKey::Name));
        }

        it "round-trips prev and next for interior fields" {
            for order in [fields(false), fields(true)] {
                for field in &order[1..order.len() - 1] {
                    let back = prev(*field, order).unwrap();
                    assert_eq!(next(back, order), Some(*field));
                }
                assert_eq!(prev(order[0], order), None);
                assert_eq!(next(order[order.len() - 1], order), None);
            }
        }
    }

    describe "attachment set" {
        before {
            let mut files = AttachmentSet::new(vec!["a.txt".to_string(), "b.txt".to_string()]);
        }

        it "filters a staged duplicate of a committed name" {
            files.toggle_delete("a.txt");
            files.stage([file("a.txt"), file("c.txt")]);

            assert_eq!(files.staged_names(), vec!["c.txt"]);
            assert_eq!(files.deleted_marks(), vec!["a.txt"]);
        }

        it "never stages the same name twice across calls" {
            files.stage([file("c.txt"), file("d.txt")]);
            files.stage([file("d.txt"), file("b.txt"), file("e.txt"), file("e.txt")]);

            let names = files.staged_names();
            assert_eq!(names, vec!["c.txt", "d.txt", "e.txt"]);
            for name in &names {
                assert!(!files.original().iter().any(|n| n == name));
            }
        }

        it "restores marks when a delete is toggled twice" {
            files.toggle_delete("b.txt");
            let before = files.deleted_marks().into_iter().map(String::from).collect::<Vec<_>>();
            files.toggle_delete("a.txt");
            files.toggle_delete("a.txt");
            assert_eq!(files.deleted_marks(), before);
        }

        it "numbers committed entries before staged ones" {
            files.toggle_delete("b.txt");
            files.stage([file("c.txt")]);

            let entries = files.entries();
            let rows: Vec<(usize, &str, AttachmentStyle)> = entries
                .iter()
                .map(|e| (e.number, e.name.as_str(), e.style))
                .collect();
            assert_eq!(
                rows,
                vec![
                    (1, "a.txt", AttachmentStyle::Committed),
                    (2, "b.txt", AttachmentStyle::Deleted),
                    (3, "c.txt", AttachmentStyle::Pending),
                ]
            );
        }
    }

    describe "creation flow" {
        before {
            let store = FakeStore::new();
            let mut session = EditSession::new(AuthContext::admin());
        }

        it "chains from name to instructions" {
            assert_eq!(session.open(FieldKey::Name).unwrap(), StepValue::text(""));

            let step = session
                .submit(StepValue::text("policy-bot"), Some(FieldKey::Instructions))
                .unwrap();

            assert_eq!(step.field, FieldKey::Name);
            assert!(step.pending);
            assert_eq!(step.next, SessionState::Editing(FieldKey::Instructions));
            assert_eq!(session.state(), SessionState::Editing(FieldKey::Instructions));
            assert_eq!(session.draft().name, "policy-bot");
            assert_eq!(session.draft().instructions, "");
        }

        it "keeps the editor open when the name is invalid" {
            session.open(FieldKey::Name).unwrap();

            let err = session
                .submit(StepValue::text("policy bot"), Some(FieldKey::Instructions))
                .unwrap_err();

            assert!(matches!(err, SessionError::Validation(_)));
            assert_eq!(session.state(), SessionState::Editing(FieldKey::Name));
            assert_eq!(session.draft().name, "");
        }

        it "refuses to commit without a name" {
            let err = session.begin_commit().unwrap_err();
            assert!(matches!(err, SessionError::Validation(_)));
            assert_eq!(session.state(), SessionState::Viewing);
        }

        it "creates the agent with every field and staged file" {
            session.open(FieldKey::Name).unwrap();
            session.submit(StepValue::text("policy-bot"), Some(FieldKey::Instructions)).unwrap();
            session.submit(StepValue::text("Answer policy questions"), Some(FieldKey::SuggestedPrompts)).unwrap();
            session.submit(StepValue::prompts(["Is flood covered?", " ", "How do I claim?"]), Some(FieldKey::Files)).unwrap();
            session.submit(StepValue::files(vec![file("policy.pdf")], ""), None).unwrap();

            let request = session.begin_commit().unwrap();
            assert_eq!(request.target, CommitTarget::Create);
            assert_eq!(request.form.name, "policy-bot");
            assert_eq!(request.form.suggested_prompts, vec!["Is flood covered?", "How do I claim?"]);
            assert!(session.is_saving());

            let result = block_on(request.send(&store));
            let saved = session.finish_commit(result).unwrap().clone();

            assert_eq!(saved.files, vec!["policy.pdf"]);
            assert_eq!(saved.processing_state, ProcessingState::InProgress);
            assert!(session.has_identity());
            assert!(!session.is_dirty());
            assert_eq!(store.calls(), vec!["create policy-bot"]);
        }
    }

    describe "editing an existing agent" {
        before {
            let store = FakeStore::with_agent(agent("policy-bot"));
            let mut session = block_on(EditSession::load(AuthContext::admin(), &store, "policy-bot")).unwrap();
        }

        it "does not offer the name" {
            assert!(!session.can_edit(FieldKey::Name));
            assert_eq!(session.open(FieldKey::Name), Err(SessionError::NotEditable(FieldKey::Name)));
            assert_eq!(session.state(), SessionState::Viewing);
        }

        it "is clean again once every field returns to its committed value" {
            session.open(FieldKey::Instructions).unwrap();
            session.submit(StepValue::text("Something else"), Some(FieldKey::Files)).unwrap();
            session.submit(StepValue::files(vec![file("c.txt")], "a.txt"), None).unwrap();
            assert!(session.is_dirty());
            assert_eq!(session.changed_fields(), vec![FieldKey::Instructions, FieldKey::Files]);

            session.open(FieldKey::Instructions).unwrap();
            session.submit(StepValue::text("Answer policy questions"), Some(FieldKey::Files)).unwrap();
            session.submit(StepValue::files(vec![], ""), None).unwrap();

            assert!(!session.is_dirty());
            assert!(session.changed_fields().is_empty());
        }

        it "styles pending and committed values" {
            session.open(FieldKey::WelcomeMessage).unwrap();
            session.submit(StepValue::text("Welcome!"), None).unwrap();

            let welcome = session.field_view(FieldKey::WelcomeMessage, "Add a welcome message");
            assert_eq!(welcome.text, "Welcome!");
            assert_eq!(welcome.style, FieldStyle::Pending);

            let instructions = session.field_view(FieldKey::Instructions, "Add instructions");
            assert_eq!(instructions.text, "Answer policy questions");
            assert_eq!(instructions.style, FieldStyle::Committed);
        }

        it "clears staging and reseeds the draft after a commit" {
            session.open(FieldKey::Files).unwrap();
            session.submit(StepValue::files(vec![file("c.txt")], "a.txt"), None).unwrap();

            let saved = block_on(session.commit(&store)).unwrap().clone();

            assert_eq!(saved.files, vec!["b.txt", "c.txt"]);
            assert!(session.attachments().staged().is_empty());
            assert!(session.attachments().deleted_marks().is_empty());
            assert_eq!(session.attachments().original(), saved.files.as_slice());
            assert_eq!(session.draft(), &DraftValues::from_agent(&saved));
            assert_eq!(session.state(), SessionState::Viewing);
        }

        it "keeps the name out of an update" {
            let request = session.begin_commit().unwrap();
            assert_eq!(request.target, CommitTarget::Update("policy-bot".to_string()));
            assert_eq!(request.form.name, "policy-bot");
        }

        it "walks the wizard arrows" {
            session.open(FieldKey::Instructions).unwrap();
            assert_eq!(session.prev_field(), None);
            let next = session.next_field();
            assert_eq!(next, Some(FieldKey::WelcomeMessage));

            session.submit(StepValue::text("Be brief"), next).unwrap();
            assert_eq!(session.prev_field(), Some(FieldKey::Instructions));
            assert_eq!(session.next_field(), Some(FieldKey::SuggestedPrompts));

            session.open(FieldKey::Files).unwrap();
            assert_eq!(session.next_field(), None);
            session.cancel().unwrap();
            assert_eq!(session.next_field(), None);
            assert_eq!(session.prev_field(), None);
        }

        it "chains a batch of steps back to viewing" {
            session
                .run_steps(vec![
                    (FieldKey::Instructions, StepValue::text("Be brief")),
                    (FieldKey::Files, StepValue::files(vec![file("c.txt")], "a.txt")),
                ])
                .unwrap();

            assert_eq!(session.state(), SessionState::Viewing);
            assert_eq!(session.draft().instructions, "Be brief");
            assert_eq!(session.changed_fields(), vec![FieldKey::Instructions, FieldKey::Files]);
        }

        it "refuses to rename in a batch" {
            let err = session
                .run_steps(vec![(FieldKey::Name, StepValue::text("renamed"))])
                .unwrap_err();
            assert_eq!(err, SessionError::NotEditable(FieldKey::Name));
            assert!(!session.is_dirty());
        }

        it "rejects finishing a save that never started" {
            let err = session
                .finish_commit(Err(StoreError::Server("boom".to_string())))
                .unwrap_err();
            assert_eq!(err, SessionError::NotSaving);
            assert_eq!(session.state(), SessionState::Viewing);
        }

        it "throws away every change on reset" {
            session.open(FieldKey::SuggestedPrompts).unwrap();
            session.submit(StepValue::prompts(["New prompt"]), Some(FieldKey::Files)).unwrap();
            session.reset().unwrap();

            assert_eq!(session.state(), SessionState::Viewing);
            assert!(!session.is_dirty());
            assert_eq!(session.draft(), &DraftValues::from_agent(session.snapshot()));
        }
    }

    describe "failed commits" {
        before {
            let store = FakeStore::with_agent(agent("policy-bot"));
            let mut session = EditSession::new(AuthContext::admin());
            session.open(FieldKey::Name).unwrap();
            session.submit(StepValue::text("policy-bot"), Some(FieldKey::Files)).unwrap();
            session.submit(StepValue::files(vec![file("notes.txt")], ""), None).unwrap();
        }

        it "leaves the draft and attachments untouched" {
            store.reject_next("name already exists");
            let draft_before = session.draft().clone();
            let attachments_before = session.attachments().clone();

            let err = block_on(session.commit(&store)).unwrap_err();

            assert_eq!(err, SessionError::ServerRejection("name already exists".to_string()));
            assert_eq!(err.to_string(), "name already exists");
            assert_eq!(session.draft(), &draft_before);
            assert_eq!(session.attachments(), &attachments_before);
            assert!(session.is_dirty());
            assert!(!session.has_identity());
        }

        it "surfaces the store's duplicate-name message" {
            let err = block_on(session.commit(&store)).unwrap_err();
            assert_eq!(err.to_string(), "Agent with this name already exists");
            assert_eq!(session.state(), SessionState::Viewing);
        }

        it "returns to the field that was open when saving started" {
            session.open(FieldKey::Instructions).unwrap();
            let _request = session.begin_commit().unwrap();

            session
                .finish_commit(Err(StoreError::Server("boom".to_string())))
                .unwrap_err();

            assert_eq!(session.state(), SessionState::Editing(FieldKey::Instructions));
        }

        it "can be retried after a rejection" {
            store.reject_next("try again");
            assert!(block_on(session.commit(&store)).is_err());

            session.open(FieldKey::Name).unwrap();
            session.submit(StepValue::text("claims-bot"), None).unwrap();
            let saved = block_on(session.commit(&store)).unwrap();
            assert_eq!(saved.name, "claims-bot");
            assert_eq!(saved.files, vec!["notes.txt"]);
        }
    }

    describe "while saving" {
        before {
            let mut session = EditSession::from_snapshot(AuthContext::admin(), agent("policy-bot"));
            let _request = session.begin_commit().unwrap();
        }

        it "rejects every edit" {
            assert_eq!(session.open(FieldKey::Instructions), Err(SessionError::CommitInFlight));
            assert_eq!(session.reset(), Err(SessionError::CommitInFlight));
            assert_eq!(session.cancel(), Err(SessionError::CommitInFlight));
            assert_eq!(session.begin_commit().unwrap_err(), SessionError::CommitInFlight);
            assert!(!session.can_edit(FieldKey::Instructions));
        }
    }

    describe "capabilities" {
        it "keeps a read-only session in viewing" {
            let mut session = EditSession::from_snapshot(AuthContext::read_only(), agent("policy-bot"));
            assert!(!session.can_edit(FieldKey::Instructions));
            assert_eq!(session.open(FieldKey::Instructions), Err(SessionError::Unauthorized));
            assert_eq!(session.begin_commit().unwrap_err(), SessionError::Unauthorized);
        }

        it "locks fields while attachments are processing" {
            let processing = Agent {
                processing_state: ProcessingState::InProgress,
                ..agent("policy-bot")
            };
            let mut session = EditSession::from_snapshot(AuthContext::admin(), processing);
            assert!(!session.can_edit(FieldKey::Instructions));
            assert!(!session.can_edit(FieldKey::Files));

            let err = session
                .run_steps(vec![
                    (FieldKey::WelcomeMessage, StepValue::text("Welcome!")),
                    (FieldKey::Files, StepValue::files(vec![file("c.txt")], "")),
                ])
                .unwrap_err();

            assert_eq!(err, SessionError::Locked(FieldKey::WelcomeMessage));
            assert_eq!(session.state(), SessionState::Viewing);
            assert!(!session.is_dirty());
        }

        it "refuses batches from a read-only session" {
            let mut session = EditSession::from_snapshot(AuthContext::read_only(), agent("policy-bot"));
            let err = session
                .run_steps(vec![(FieldKey::Instructions, StepValue::text("x"))])
                .unwrap_err();
            assert_eq!(err, SessionError::Unauthorized);
        }
    }
}

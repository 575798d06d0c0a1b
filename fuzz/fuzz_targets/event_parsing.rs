#![no_main]

//! Fuzz target for identity event parsing.
//!
//! Bodies reach the parser only after signature verification, but a
//! misbehaving sender can still sign anything. Parsing must never panic and
//! a successfully parsed user event must always carry its provider ID.

use libfuzzer_sys::fuzz_target;
use usersync_core::IdentityEvent;

fuzz_target!(|data: &[u8]| {
    let Ok(event) = IdentityEvent::parse(data) else { return };

    match event {
        IdentityEvent::Created(created) => {
            let id = created.id.clone();
            if let Some(user) = created.into_new_user() {
                assert_eq!(user.clerk_id, id);
            }
        },
        IdentityEvent::Updated(updated) => {
            let id = updated.id.clone();
            let (target, _) = updated.into_update();
            assert_eq!(target, id);
        },
        IdentityEvent::Deleted(deleted) => {
            let event = IdentityEvent::Deleted(deleted);
            assert_eq!(event.event_type(), "user.deleted");
            assert!(event.external_id().is_some());
        },
        IdentityEvent::Other { event_type, .. } => {
            let known = ["user.created", "user.updated", "user.deleted"];
            assert!(!known.contains(&event_type.as_str()));
        },
    }
});

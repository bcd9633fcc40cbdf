// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cadence engagement scheduler.
//!
//! This crate provides the error type, domain types, and adapter traits
//! shared by the debounce aggregator and the follow-up scheduler, plus the
//! two primitives both halves dispatch through: the per-conversation
//! [`ConversationLease`] and the bounded [`DispatchPool`].

pub mod clock;
pub mod dispatch;
pub mod error;
pub mod lease;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{DispatchPool, QueuedGuard, QueuedIds};
pub use error::CadenceError;
pub use lease::{ConversationLease, LeaseGuard};
pub use types::{AdapterType, HealthStatus};

pub use traits::{ConversationLock, Directory, FollowUpStore, PluginAdapter, Responder, StateStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_error_has_all_variants() {
        let _config = CadenceError::Config("test".into());
        let _storage = CadenceError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _validation = CadenceError::Validation("test".into());
        let _not_found = CadenceError::NotFound {
            entity: "conversation".into(),
            id: "c-1".into(),
        };
        let _responder = CadenceError::Responder {
            message: "test".into(),
            source: None,
        };
        let _timeout = CadenceError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = CadenceError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        let variants = [
            AdapterType::StateStore,
            AdapterType::FollowUpStore,
            AdapterType::Directory,
            AdapterType::Responder,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_state_store<T: StateStore>() {}
        fn _assert_conversation_lock<T: ConversationLock>() {}
        fn _assert_follow_up_store<T: FollowUpStore>() {}
        fn _assert_directory<T: Directory>() {}
        fn _assert_responder<T: Responder>() {}
    }
}

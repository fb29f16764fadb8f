// src/core/activation.rs

//! Resources that only exist while a ROS environment is sourced.
//!
//! [`ActivationHandle`] listens to the environment signal and rebuilds its
//! [`Activation`] from scratch on every emission. The previous state is
//! dropped first, so nothing from an old environment survives a re-source.

use crate::{
    core::{
        master::MasterClient,
        signal::{EnvironmentSnapshot, Subscription},
    },
    state::AppContext,
};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Activation {
    /// No ROS environment: only workspace-independent commands are offered.
    #[default]
    Inactive,
    Active {
        master: MasterClient,
        distro: Option<String>,
    },
}

impl Activation {
    pub fn from_snapshot(snapshot: &EnvironmentSnapshot) -> Self {
        match snapshot {
            Some(env) if env.is_ros() => Self::Active {
                master: MasterClient::new(env.master_uri()),
                distro: env.distro().map(str::to_string),
            },
            _ => Self::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn master(&self) -> Option<&MasterClient> {
        match self {
            Self::Active { master, .. } => Some(master),
            Self::Inactive => None,
        }
    }

    /// Whether a command is available in this state.
    pub fn allows(&self, requires_env: bool) -> bool {
        !requires_env || self.is_active()
    }
}

/// Keeps an [`Activation`] in sync with the context's environment.
#[derive(Debug)]
pub struct ActivationHandle {
    state: Arc<Mutex<Activation>>,
    _subscription: Subscription,
}

impl ActivationHandle {
    /// Builds the activation for the current environment and follows every later change.
    pub fn attach(ctx: &AppContext) -> Self {
        let state = Arc::new(Mutex::new(Activation::from_snapshot(&ctx.environment())));
        let sink = Arc::clone(&state);
        let subscription = ctx.subscribe(move |snapshot| {
            let mut current = sink.lock().unwrap_or_else(PoisonError::into_inner);
            // Tear down before rebuilding.
            *current = Activation::Inactive;
            *current = Activation::from_snapshot(snapshot);
            log::debug!("Activation rebuilt: active = {}.", current.is_active());
        });
        Self {
            state,
            _subscription: subscription,
        }
    }

    pub fn current(&self) -> Activation {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn master(&self) -> Option<MasterClient> {
        self.current().master().cloned()
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::Authenticator;
use crate::store::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<UserStore>>,
    pub auth: Arc<Authenticator>,
}

impl AppState {
    pub fn new(store: UserStore, auth: Authenticator) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            auth: Arc::new(auth),
        }
    }
}

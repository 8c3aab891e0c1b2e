use std::{ops::Deref, sync::Arc};

use crate::{rate_limit::RateLimiter, store::BookStore};

#[derive(Clone)]
pub struct ApiState {
    inner: Arc<ApiStateInner>,
}

impl ApiState {
    pub fn new(store: BookStore, rate_limiter: RateLimiter) -> Self {
        Self {
            inner: Arc::new(ApiStateInner {
                store,
                rate_limiter,
            }),
        }
    }
}

impl Deref for ApiState {
    type Target = ApiStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct ApiStateInner {
    store: BookStore,
    rate_limiter: RateLimiter,
}

impl ApiStateInner {
    pub fn store(&self) -> &BookStore {
        &self.store
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

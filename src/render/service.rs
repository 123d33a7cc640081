//! Render service - manages worker pool and cache

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flume::{Receiver, Sender};
use log::debug;

use super::cache::{CacheKey, PageCache};
use super::request::{
    PageRenderer, RenderFault, RenderParams, RenderRequest, RenderResponse, RequestId,
    RenderedPage,
};
use super::worker::render_worker;

/// Default number of render threads
pub const DEFAULT_WORKERS: usize = 2;
/// Default number of rendered pages kept in memory
pub const DEFAULT_CACHE_SIZE: usize = 32;

/// Runs page renderers on worker threads and caches their output
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    pending_requests: HashMap<RequestId, RenderParams>,
    cache: Arc<Mutex<PageCache>>,
    num_workers: usize,
}

impl RenderService {
    /// Start `num_workers` threads, each with its own renderer built by `factory`
    pub fn new<R, F>(factory: F, num_workers: usize, cache_size: usize) -> Self
    where
        R: PageRenderer + 'static,
        F: Fn() -> Result<R, RenderFault> + Send + Sync + 'static,
    {
        let cache = Arc::new(Mutex::new(PageCache::new(cache_size)));

        // flume channels are MPMC: every worker pulls from the same request queue
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        let factory = Arc::new(factory);

        for worker_idx in 0..num_workers.max(1) {
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let cache_clone = cache.clone();
            let factory = factory.clone();

            std::thread::spawn(move || {
                debug!("Render worker {worker_idx} started");
                render_worker((*factory)(), rx, tx, cache_clone);
            });
        }

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            pending_requests: HashMap::new(),
            cache,
            num_workers: num_workers.max(1),
        }
    }

    /// Queue a page for rendering
    pub fn request(&mut self, params: RenderParams) -> RequestId {
        let id = self.next_id();
        let _ = self.request_tx.send(RenderRequest::Page { id, params });
        self.pending_requests.insert(id, params);
        id
    }

    /// True if a request with the same output is still pending
    #[must_use]
    pub fn is_in_flight(&self, params: &RenderParams) -> bool {
        let key = CacheKey::from_params(params);
        self.pending_requests
            .values()
            .any(|pending| CacheKey::from_params(pending) == key)
    }

    /// Stop waiting for requests with the same output as `params`, e.g.
    /// after their worker stalled. A late answer is still delivered.
    pub fn forget(&mut self, params: &RenderParams) -> usize {
        let key = CacheKey::from_params(params);
        let before = self.pending_requests.len();
        self.pending_requests
            .retain(|_, pending| CacheKey::from_params(pending) != key);
        let forgotten = before - self.pending_requests.len();
        if forgotten > 0 {
            debug!("Forgot {forgotten} pending render(s) of page {}", params.page);
        }
        forgotten
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending_requests.len()
    }

    /// Get a cached page if available
    #[must_use]
    pub fn cached(&self, params: &RenderParams) -> Option<Arc<RenderedPage>> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&CacheKey::from_params(params))
    }

    /// Poll for completed render responses
    pub fn poll_responses(&mut self) -> Vec<RenderResponse> {
        let mut responses = vec![];
        while let Ok(response) = self.response_rx.try_recv() {
            self.pending_requests.remove(&response.id());
            responses.push(response);
        }
        responses
    }

    /// Block until one response arrives or the timeout expires
    pub fn wait_response(&mut self, timeout: Duration) -> Option<RenderResponse> {
        let response = self.response_rx.recv_timeout(timeout).ok()?;
        self.pending_requests.remove(&response.id());
        Some(response)
    }

    pub fn invalidate_all(&self) {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .invalidate_all();
    }

    pub fn invalidate_page(&self, page: usize) {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .invalidate_page(page);
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

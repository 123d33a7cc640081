//! Render worker - runs in separate thread(s)

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::{debug, error};

use super::cache::{CacheKey, PageCache};
use super::request::{
    PageRenderer, RenderFault, RenderParams, RenderRequest, RenderResponse, RequestId,
};

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker<R: PageRenderer>(
    renderer: Result<R, RenderFault>,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    cache: Arc<Mutex<PageCache>>,
) {
    let mut renderer = match renderer {
        Ok(r) => r,
        Err(e) => {
            error!("Render worker failed to start: {e}");
            // Answer every request so the viewer can mark pages as failed
            for request in requests {
                match request {
                    RenderRequest::Page { id, params } => {
                        let _ = responses.send(RenderResponse::Error {
                            id,
                            params,
                            error: RenderFault::generic(format!("renderer unavailable: {e}")),
                        });
                    }
                    RenderRequest::Shutdown => break,
                }
            }
            return;
        }
    };

    for request in requests {
        match request {
            RenderRequest::Page { id, params } => {
                handle_page_request(&mut renderer, id, params, &cache, &responses);
            }
            RenderRequest::Shutdown => break,
        }
    }
    debug!("Render worker stopped");
}

fn handle_page_request<R: PageRenderer>(
    renderer: &mut R,
    id: RequestId,
    params: RenderParams,
    cache: &Arc<Mutex<PageCache>>,
    responses: &Sender<RenderResponse>,
) {
    let key = CacheKey::from_params(&params);

    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);
    if let Some(data) = cached {
        let _ = responses.send(RenderResponse::Page { id, params, data });
        return;
    }

    // A panicking backend must still answer, or the page waits forever
    let rendered = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(&params)))
        .unwrap_or_else(|payload| {
            let detail = panic_message(payload.as_ref());
            error!("Renderer panicked on page {}: {detail}", params.page);
            Err(RenderFault::generic(format!("renderer panicked: {detail}")))
        });

    match rendered {
        Ok(page) => {
            let data = cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key, page);
            let _ = responses.send(RenderResponse::Page { id, params, data });
        }
        Err(error) => {
            let _ = responses.send(RenderResponse::Error { id, params, error });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

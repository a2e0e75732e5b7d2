use super::state::{StreamUpdate, TurnEvent, TurnRequest};
use crate::api::logging::emit_premature_end;
use crate::api::stream::{StreamItem, StreamParser};
use crate::api::ApiClient;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Consume one streaming turn: open the request, decode chunks as they
/// arrive, and forward generation-tagged updates. Runs as its own task; a
/// cancelled token stops consumption without emitting anything further, so
/// a superseded turn goes quiet instead of racing the new one.
pub async fn drive_turn(
    client: Arc<ApiClient>,
    request: TurnRequest,
    update_tx: mpsc::UnboundedSender<StreamUpdate>,
) {
    let generation = request.generation;
    let emit = |event: TurnEvent| {
        let _ = update_tx.send(StreamUpdate { generation, event });
    };

    let mut stream = match client.create_stream(&request.messages, &request.model).await {
        Ok(stream) => stream,
        Err(error) => {
            emit(TurnEvent::Failed {
                error: error.to_string(),
            });
            return;
        }
    };

    let mut parser = StreamParser::new();
    loop {
        tokio::select! {
            biased;
            _ = request.cancel.cancelled() => return,
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for item in parser.process(&bytes) {
                        match item {
                            StreamItem::Delta(delta) => emit(TurnEvent::Delta(delta)),
                            StreamItem::Done => {
                                emit(TurnEvent::Completed);
                                return;
                            }
                        }
                    }
                }
                Some(Err(error)) => {
                    emit(TurnEvent::Failed {
                        error: error.to_string(),
                    });
                    return;
                }
                None => {
                    // Transport closed without the sentinel: whatever was
                    // merged stands as the final message.
                    if !parser.is_done() {
                        emit_premature_end();
                    }
                    emit(TurnEvent::Completed);
                    return;
                }
            },
        }
    }
}

use log::{debug, info, warn};

use crate::app::state::AppState;
use crate::transport::NetworkEvent;
use crate::utils::format_timestamp;

pub struct IngestionHandler;

impl IngestionHandler {
    /// Drain everything the network thread queued since the last frame.
    /// Returns the number of samples ingested.
    pub fn handle_events(state: &mut AppState, now: i64) -> usize {
        let mut ingested = 0;
        while let Ok(event) = state.channels.events.try_recv() {
            match event {
                NetworkEvent::Status(status) => {
                    if status != state.status {
                        info!("Connection status: {}", status);
                    }
                    state.status = status;
                }
                NetworkEvent::Message { payload, received_at } => {
                    match state.ingest_payload(&payload, received_at, now) {
                        Ok(sample) => {
                            ingested += 1;
                            debug!(
                                "Sample - ax: {:.2}, ay: {:.2}, az: {:.2}, |a|: {:.2}, time: {}",
                                sample.accel_x,
                                sample.accel_y,
                                sample.accel_z,
                                sample.accel_magnitude,
                                format_timestamp(sample.time)
                            );
                        }
                        Err(e) => {
                            warn!("Dropping payload: {}", e);
                            state.stats.rejected += 1;
                            state.stats.last_error = Some(e.to_string());
                        }
                    }
                }
            }
        }
        ingested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::transport::ConnectionStatus;

    #[test]
    fn drains_status_and_messages_in_order() {
        let (events_tx, events) = crossbeam_channel::unbounded();
        let (commands, _commands_rx) = crossbeam_channel::unbounded();
        let mut state = AppState::new(&AppConfig::default(), events, commands);

        events_tx.send(NetworkEvent::Status(ConnectionStatus::Connected)).unwrap();
        for (i, payload) in [
            r#"{"ax":1,"ay":0,"az":0,"oa":0,"ob":0,"og":0}"#,
            "garbage",
            r#"{"ax":2,"ay":0,"az":0,"oa":0,"ob":0,"og":0}"#,
        ]
        .iter()
        .enumerate()
        {
            events_tx
                .send(NetworkEvent::Message {
                    payload: payload.as_bytes().to_vec(),
                    received_at: 1_000 + i as i64 * 100,
                })
                .unwrap();
        }

        assert_eq!(IngestionHandler::handle_events(&mut state, 1_200), 2);
        assert!(state.is_connected());
        assert_eq!(state.stats.rejected, 1);
        assert_eq!(state.latest().unwrap().accel_x, 2.0);

        let xs: Vec<i64> = state.registry.charts()[0].series[0].points.iter().map(|p| p.x).collect();
        assert!(xs.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(*xs.last().unwrap(), 1_200);
    }
}

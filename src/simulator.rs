use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::codec::{encode_event, DeviceReading};

const GRAVITY: f64 = 9.81;

/// Synthetic phone motion: slow yaw spin, gentle pitch/roll sway, noisy gravity.
pub struct MotionSimulator<R: Rng> {
    rng: R,
    noise: f64,
    step: u64,
    interval: Duration,
}

impl MotionSimulator<StdRng> {
    pub fn new(noise: f64, interval: Duration) -> Self {
        Self::with_rng(StdRng::from_os_rng(), noise, interval)
    }
}

impl<R: Rng> MotionSimulator<R> {
    pub fn with_rng(rng: R, noise: f64, interval: Duration) -> Self {
        Self {
            rng,
            noise: noise.abs(),
            step: 0,
            interval,
        }
    }

    fn jitter(&mut self) -> f64 {
        if self.noise > 0.0 {
            self.rng.random_range(-self.noise..=self.noise)
        } else {
            0.0
        }
    }

    pub fn next_reading(&mut self) -> DeviceReading {
        let t = self.step as f64 * self.interval.as_secs_f64();
        self.step += 1;

        let alpha = (t * 12.0) % 360.0;
        let beta = 30.0 * (t * 0.5).sin();
        let gamma = 20.0 * (t * 0.3).sin();

        let (beta_rad, gamma_rad) = (beta.to_radians(), gamma.to_radians());
        DeviceReading {
            ax: GRAVITY * beta_rad.cos() * gamma_rad.sin() + self.jitter(),
            ay: GRAVITY * beta_rad.sin() + self.jitter(),
            az: GRAVITY * beta_rad.cos() * gamma_rad.cos() + self.jitter(),
            oa: alpha,
            ob: beta,
            og: gamma,
        }
    }
}

/// Publish readings into `outbound` every `interval` until `count` readings
/// were queued, the channel closes, or `shutdown` is set. Returns the number queued.
pub fn run_simulator<R: Rng>(
    mut simulator: MotionSimulator<R>,
    count: Option<u64>,
    outbound: Sender<Vec<u8>>,
    shutdown: Arc<AtomicBool>,
) -> u64 {
    let interval = simulator.interval;
    let mut published = 0;

    while count.map_or(true, |limit| published < limit) {
        if shutdown.load(Ordering::Relaxed) {
            info!("Simulator received shutdown signal");
            break;
        }

        let reading = simulator.next_reading();
        match encode_event(&reading) {
            Ok(payload) => {
                if outbound.send(payload).is_err() {
                    info!("Outbound channel closed, simulator exiting");
                    break;
                }
                published += 1;
                debug!(
                    "Queued reading #{}: ax={:.2} ay={:.2} az={:.2}",
                    published, reading.ax, reading.ay, reading.az
                );
            }
            Err(e) => warn!("Failed to encode reading: {}", e),
        }

        thread::sleep(interval);
    }

    published
}

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use phytron_mcc2::axis::config::AxisConfig;
use phytron_mcc2::axis::state::DeviceState;
use phytron_mcc2::error::Result;
use phytron_mcc2::protocol::frame::{AxisSelector, ModuleAddress};
use phytron_mcc2::registry;
use phytron_mcc2::transport::sim::{SimulatedBus, SimulatedTransport};
use phytron_mcc2::transport::{self, Transport};
use phytron_mcc2::{Mcc2Axis, Mcc2Module};

/// Wraps the simulator and counts requests that enter while another one is
/// still in flight.
struct OverlapCounter {
    inner: SimulatedTransport,
    in_flight: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Transport for OverlapCounter {
    async fn open(&mut self) -> Result<()> {
        self.inner.open().await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    async fn write_read(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        let response = self.inner.write_read(request, timeout).await;
        self.in_flight.store(false, Ordering::SeqCst);
        response
    }
}

async fn exercise(axis: &Mcc2Axis, target: f64) -> Result<()> {
    for step in 0..5 {
        axis.move_absolute(target * f64::from(step)).await?;
        axis.read_status().await?;
        axis.read_parameter(registry::VELOCITY).await?;
        axis.read_position().await?;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn axes_on_one_module_never_overlap_on_the_wire() {
    let address = ModuleAddress::new(4).unwrap();
    let bus = SimulatedBus::new().with_module(address, "MCC2 V3.1");
    let overlaps = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let shared = transport::shared(OverlapCounter {
        inner: bus.transport(),
        in_flight: Arc::new(AtomicBool::new(false)),
        overlaps: overlaps.clone(),
        calls: calls.clone(),
    });

    let module = Arc::new(Mcc2Module::new(
        "stage",
        address,
        vec![
            AxisConfig::new("x", AxisSelector::X),
            AxisConfig::new("y", AxisSelector::Y),
        ],
        shared,
        Duration::from_millis(100),
    ));
    module.init().await.unwrap();
    let x = module.axis(AxisSelector::X).unwrap().clone();
    let y = module.axis(AxisSelector::Y).unwrap().clone();
    let before = calls.load(Ordering::SeqCst);

    let x_task = tokio::spawn(async move { exercise(&x, 1.0).await });
    let y_task = tokio::spawn(async move { exercise(&y, -2.0).await });
    let (x_result, y_result) = tokio::join!(x_task, y_task);
    x_result.unwrap().unwrap();
    y_result.unwrap().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst) - before, 2 * 5 * 4);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(bus.register(address, AxisSelector::X, 20), Some(4.0));
    assert_eq!(bus.register(address, AxisSelector::Y, 20), Some(-8.0));

    for selector in [AxisSelector::X, AxisSelector::Y] {
        let axis = module.axis(selector).unwrap();
        assert_ne!(axis.state().await, DeviceState::Fault);
    }
}

use std::time::Duration;

use anyhow::Result;
use phytron_mcc2::{
    axis::movement_parameters::MovementParams,
    configurator::Configurator,
    motor_controller::MotorController,
    protocol::{
        frame::{AxisSelector, ModuleAddress},
        opcode::Direction,
    },
    registry,
    transport::{self, sim::SimulatedBus},
    BusConfig,
};
use tracing::{error, info};

const BUS: &str = r#"{
    "transport": { "settle_delay_ms": 0, "read_timeout_ms": 100 },
    "modules": [
        {
            "name": "slits",
            "address": 0,
            "axes": [
                { "name": "slit_left", "selector": "X" },
                { "name": "slit_right", "selector": "Y", "inverted": true }
            ]
        },
        {
            "name": "sample",
            "address": 1,
            "axes": [
                { "name": "rotation", "selector": "X", "encoder": "incremental" }
            ]
        }
    ]
}"#;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting simulated MCC-2 bus");

    let config: BusConfig = serde_json::from_str(BUS)?;
    let bus = SimulatedBus::new()
        .with_module(ModuleAddress::new(0)?, "MCC2 V3.1")
        .with_module(ModuleAddress::new(1)?, "MCC2 V2.6");
    bus.set_motion_polls(3);

    let modules = config.build_modules(transport::shared(bus.transport()));
    for module in &modules {
        module.init().await?;
    }
    let (slits, sample) = (&modules[0], &modules[1]);

    let params = MovementParams::new()
        .with_velocity(2000.0)
        .with_acceleration(8000.0);
    slits.start("slit_right", 2.5, Some(params)).await?;

    loop {
        let state = slits.state("slit_right").await?;
        info!("slit_right state: {:?}", state.state);
        if !state.is_moving() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    info!(
        "slit_right at {} (raw counter {:?})",
        slits.get_attribute("slit_right", "position").await?,
        bus.register(slits.address(), AxisSelector::Y, 20)
    );

    let rotation = &sample.mcc2_axes()[0];
    rotation.home(Direction::Minus).await?;
    rotation.move_absolute(90.0).await?;
    let snapshot = rotation.refresh().await?;
    let format = rotation.display_format().await;
    info!("rotation: {} ({:?})", format.format(snapshot.position), snapshot.state);

    bus.set_register(
        slits.address(),
        AxisSelector::X,
        registry::RUN_CURRENT,
        12.0,
    );
    if let Some(left) = slits.mcc2_axes().first() {
        let configurator = Configurator::new(left);
        let report = configurator.compare_with_device().await?;
        println!("{}", report);
        configurator.reset_to_default().await?;
        configurator.save_to_flash().await?;
    }

    bus.set_silent(true);
    match slits.state("slit_left").await {
        Ok(state) if state.is_faulted() => error!(
            "slit_left faulted: {}",
            state.message.unwrap_or_default()
        ),
        Ok(state) => info!("slit_left state: {:?}", state.state),
        Err(e) => error!("slit_left state failed: {}", e),
    }
    bus.set_silent(false);

    for module in &modules {
        module.shutdown().await?;
    }
    info!("Bus log: {} requests", bus.log().len());
    Ok(())
}

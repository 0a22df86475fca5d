//! A hand-written service wrapper in the shape generated bindings take.
//!
//! Run against a live server:
//!
//! ```text
//! cargo run -p krpc --example service-wrapper
//! ```

use krpc::client::{CallDescriptor, Result};
use krpc::{
    build_call, encode, remote_enum, Client, ClientConfig, Event, Object, ObjectType, Stream,
};

remote_enum! {
    /// Scene the game is showing.
    pub struct GameScene {
        SPACE_CENTER = 0,
        FLIGHT = 1,
        TRACKING_STATION = 2,
        EDITOR_VAB = 3,
        EDITOR_SPH = 4,
    }
}

pub enum VesselClass {}
impl ObjectType for VesselClass {
    const NAME: &'static str = "Vessel";
}
pub type Vessel = Object<VesselClass>;

pub enum ExpressionClass {}
impl ObjectType for ExpressionClass {
    const NAME: &'static str = "Expression";
}
pub type Expression = Object<ExpressionClass>;

#[derive(Debug, thiserror::Error)]
#[error("invalid operation: {0}")]
pub struct InvalidOperation(String);

/// Typed view of the `SpaceCenter` service.
pub struct SpaceCenter {
    client: Client,
}

impl SpaceCenter {
    pub fn new(client: &Client) -> Self {
        client.add_exception_thrower("SpaceCenter", "InvalidOperationException", |m: &str| {
            InvalidOperation(m.to_string())
        });
        Self {
            client: client.clone(),
        }
    }

    fn active_vessel_call() -> CallDescriptor {
        build_call("SpaceCenter", "get_ActiveVessel", Vec::<bytes::Bytes>::new())
    }

    pub fn active_vessel(&self) -> Result<Vessel> {
        self.client.call(&Self::active_vessel_call())
    }

    pub fn game_scene(&self) -> Result<GameScene> {
        self.client.call(&build_call(
            "KRPC",
            "get_CurrentGameScene",
            Vec::<bytes::Bytes>::new(),
        ))
    }

    pub fn ut_stream(&self) -> Result<Stream<f64>> {
        self.client.add_stream(&build_call(
            "SpaceCenter",
            "get_UT",
            Vec::<bytes::Bytes>::new(),
        ))
    }

    pub fn vessel_name(&self, vessel: Vessel) -> Result<String> {
        self.client
            .call(&build_call("SpaceCenter", "Vessel_get_Name", [encode(&vessel)]))
    }

    /// Fires once universal time passes `ut`.
    pub fn ut_reached(&self, ut: f64) -> Result<Event> {
        let ut_call = build_call("SpaceCenter", "get_UT", Vec::<bytes::Bytes>::new());
        let now: Expression = self
            .client
            .call(&build_call("KRPC", "Expression_Call", [encode(&ut_call)]))?;
        let target: Expression = self.client.call(&build_call(
            "KRPC",
            "Expression_ConstantDouble",
            [encode(&ut)],
        ))?;
        let reached: Expression = self.client.call(&build_call(
            "KRPC",
            "Expression_GreaterThan",
            [encode(&now), encode(&target)],
        ))?;
        self.client
            .add_event(&build_call("KRPC", "AddEvent", [encode(&reached)]))
    }
}

fn main() -> Result<()> {
    let client = Client::connect(ClientConfig::default().with_client_name("wrapper-example"))?;
    let space_center = SpaceCenter::new(&client);

    println!("scene: {:?}", space_center.game_scene()?);

    match space_center.active_vessel() {
        Ok(vessel) if !vessel.is_null() => {
            println!("{vessel}: {}", space_center.vessel_name(vessel)?);
        }
        Ok(_) => println!("no active vessel"),
        Err(err) => match err.downcast_ref::<InvalidOperation>() {
            Some(invalid) => println!("no active vessel: {invalid}"),
            None => return Err(err),
        },
    }

    let ut = space_center.ut_stream()?;
    let start = ut.get()?;
    println!("universal time: {start:.1}");

    let later = space_center.ut_reached(start + 5.0)?;
    later.wait()?;
    println!("five seconds of game time passed: {:.1}", ut.get()?);

    client.close();
    Ok(())
}

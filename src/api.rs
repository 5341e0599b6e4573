pub mod solaredge;

pub use self::solaredge::Api as SolarEdge;

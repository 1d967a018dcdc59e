//! HTTP collaborators behind the core's narrow interfaces.

pub mod mem0;
pub mod weather;

pub use mem0::{Mem0Client, Mem0Config};
pub use weather::{OpenMeteoClient, WeatherConfig};

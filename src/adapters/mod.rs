//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements              | Connects to                 |
//! |-----------------|-------------------------|-----------------------------|
//! | `adx`           | TelemetryStore          | ADX REST API (OAuth2 + v2)  |
//! |                 | QueryClient             |                             |
//! | `config_source` | ConfigPort              | Environment / TOML file     |
//! | `log_sink`      | EventSink               | `log` facade                |
//! | `memory_broker` | MessageBroker           | In-process topic logs       |
//! |                 | PublishChannel          |                             |
//! |                 | SubscribeChannel        |                             |
//! | `commander_sim` | (peer on the broker)    | Command / response topics   |

pub mod adx;
pub mod commander_sim;
pub mod config_source;
pub mod log_sink;
pub mod memory_broker;

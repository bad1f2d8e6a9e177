//! Configuration options parsed from the `protoc` parameter string.

use log::debug;

/// Code generation options.
///
/// Parsed from the comma-separated parameter string `protoc` passes through
/// to the plugin, e.g.
/// `--protowire_opt=plugins=grpc,using_value_wrappers=true`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Requested plugin passthroughs, e.g. `grpc`.
    pub plugins: Vec<String>,
    /// Embed the serialized file descriptor in each generated module.
    pub gen_descriptors: bool,
    /// Collapse single-field `XxxValue` wrapper messages into their payload
    /// type.
    pub using_value_wrappers: bool,
}

impl Config {
    /// Parses a `protoc` parameter string. Unrecognized options are ignored
    /// so that newer invocations keep working against older plugins.
    pub fn from_parameter(parameter: &str) -> Config {
        let mut config = Config::default();
        for option in parameter.split(',').filter(|option| !option.is_empty()) {
            let (key, value) = option.split_once('=').unwrap_or((option, ""));
            match key {
                "plugins" => {
                    config.plugins = value
                        .split('+')
                        .filter(|plugin| !plugin.is_empty())
                        .map(str::to_owned)
                        .collect();
                }
                "gen_descriptors" => config.gen_descriptors = value == "true",
                "using_value_wrappers" => config.using_value_wrappers = value == "true",
                _ => debug!("ignoring unknown option: {:?}", option),
            }
        }
        config
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|plugin| plugin == name)
    }
}

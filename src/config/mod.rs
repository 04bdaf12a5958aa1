pub mod schema;

#[allow(unused_imports)]
pub use schema::{
    resolve_config_path, AgentConfig, Config, EndpointConfig, GatewayConfig, ObservabilityConfig,
    RejectedOverride, RoutingConfig,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reexported_config_default_is_constructible() {
        let config = Config::default();

        assert!(config.default_provider.is_some());
        assert!(config.default_model.is_some());
        assert!(config.default_temperature > 0.0);
    }
}

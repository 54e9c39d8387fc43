use anyhow::Result;
use std::io::Write;

#[cfg(test)]
mod config_from_file_tests {
    use std::time::Duration;

    use tempfile::NamedTempFile;

    use crate::config::{Config, ConfigError, StrategyConfig};
    use crate::constants::{PROBE_MODULE_ANNOTATION, PROBE_TARGET_ANNOTATION};

    use super::*;

    #[tokio::test]
    async fn reads_network_latency_config() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            &mut file,
            r#"
scheduler_name: network-scheduler
strategy:
  kind: network_latency
  prober:
    selector:
      app: prober
    namespace: monitoring
    timeout_ms: 500
  quota: 10
seed: 42
"#
        )?;

        let config = Config::from_file(file.path()).await?;

        assert_eq!(Some(42), config.seed);
        assert_eq!(Duration::from_secs(15), config.resync_interval());

        let StrategyConfig::NetworkLatency(network) = config.strategy else {
            panic!("expected network latency strategy");
        };
        assert_eq!(9115, network.prober.port);
        assert_eq!(Duration::from_millis(500), network.prober.timeout());
        assert_eq!("http_2xx", network.prober.module);
        assert_eq!(Some(10), network.quota);
        assert_eq!(PROBE_TARGET_ANNOTATION, network.annotations.target);
        assert_eq!(PROBE_MODULE_ANNOTATION, network.annotations.module);

        Ok(())
    }

    #[tokio::test]
    async fn reads_strategies_without_parameters() -> Result<()> {
        for (kind, expected) in [
            ("image_locality", "ImageLocality"),
            ("uniform_random", "UniformRandom"),
        ] {
            let mut file = NamedTempFile::new()?;
            write!(&mut file, "strategy:\n  kind: {kind}\n")?;

            let config = Config::from_file(file.path()).await?;

            assert_eq!("network-scheduler", config.scheduler_name);
            assert!(format!("{:?}", config.strategy).starts_with(expected));
        }

        Ok(())
    }

    #[tokio::test]
    async fn prober_selector_is_required() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            &mut file,
            r#"
strategy:
  kind: network_latency
  prober:
    selector: {{}}
    namespace: monitoring
"#
        )?;

        let error = Config::from_file(file.path()).await.unwrap_err();

        assert_eq!(ConfigError::MissingSelector, error.downcast()?);

        Ok(())
    }

    #[tokio::test]
    async fn prober_port_must_not_be_zero() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            &mut file,
            r#"
strategy:
  kind: network_latency
  prober:
    selector:
      app: prober
    namespace: monitoring
    port: 0
"#
        )?;

        let error = Config::from_file(file.path()).await.unwrap_err();

        assert_eq!(ConfigError::InvalidPort(0), error.downcast()?);

        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_port_is_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            &mut file,
            r#"
strategy:
  kind: network_latency
  prober:
    selector:
      app: prober
    namespace: monitoring
    port: 70000
"#
        )?;

        assert!(Config::from_file(file.path()).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn unknown_strategy_is_rejected() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(&mut file, "strategy:\n  kind: bin_packing\n")?;

        assert!(Config::from_file(file.path()).await.is_err());

        Ok(())
    }
}

#[cfg(test)]
mod config_validate_tests {
    use crate::config::{ConfigError, StrategyConfig};
    use crate::test_support::{config, network_config};

    #[test]
    fn accepts_valid_configs() {
        assert_eq!(Ok(()), config(StrategyConfig::ImageLocality).validate());
        assert_eq!(Ok(()), network_config(9115, 3000, Some(5)).validate());
    }

    #[test]
    fn rejects_zero_timeout() {
        assert_eq!(
            Err(ConfigError::InvalidTimeout),
            network_config(9115, 0, None).validate()
        );
    }

    #[test]
    fn rejects_empty_namespace() {
        let mut config = network_config(9115, 3000, None);
        if let StrategyConfig::NetworkLatency(network) = &mut config.strategy {
            network.prober.namespace.clear();
        }

        assert_eq!(Err(ConfigError::MissingNamespace), config.validate());
    }

    #[test]
    fn rejects_empty_scheduler_name() {
        let mut config = config(StrategyConfig::UniformRandom);
        config.scheduler_name.clear();

        assert_eq!(Err(ConfigError::MissingSchedulerName), config.validate());
    }
}

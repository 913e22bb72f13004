use crate::config::Config;
use crate::config::ConfigError;

#[test]
fn test_config_defaults() {
    let config = Config::default().validate().unwrap();

    assert_eq!(8, config.snapshot_max_attempts);
    assert_eq!(50, config.retry_backoff_min);
    assert_eq!(1000, config.retry_backoff_max);
}

#[test]
fn test_config_from_args() -> anyhow::Result<()> {
    let config = Config::build(&[
        "repstate",
        "--snapshot-max-attempts=3",
        "--retry-backoff-min=10",
        "--retry-backoff-max=20",
    ])?;

    assert_eq!(3, config.snapshot_max_attempts);
    assert_eq!(10, config.retry_backoff_min);
    assert_eq!(20, config.retry_backoff_max);

    Ok(())
}

#[test]
fn test_config_reversed_backoff_is_rejected() {
    let res = Config::build(&["repstate", "--retry-backoff-min=500", "--retry-backoff-max=100"]);

    assert_eq!(
        Err(ConfigError::BackoffReversed { min: 500, max: 100 }),
        res
    );
}

#[test]
fn test_config_zero_attempts_is_rejected() {
    let res = Config::build(&["repstate", "--snapshot-max-attempts=0"]);

    assert_eq!(Err(ConfigError::NoTransferAttempts), res);
}

#[test]
fn test_rand_backoff_is_within_bounds() -> anyhow::Result<()> {
    let config = Config::build(&["repstate", "--retry-backoff-min=100", "--retry-backoff-max=200"])?;

    for _ in 0..100 {
        let d = config.new_rand_backoff();
        assert!(d.as_millis() >= 100);
        assert!(d.as_millis() <= 200);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use lookaheadrs::cli::validate_device;
    use lookaheadrs::*;

    fn mock_devices() -> Vec<String> {
        vec!["Mock Device 1".to_string(), "Mock Device 2".to_string()]
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["test"]);
        assert!(!args.list_devices);
        assert!(!args.dry_run);
        assert_eq!(args.midi_output, None);
        assert_eq!(args.tempo, None);
        assert!(args.instruments.is_empty());
    }

    #[test]
    fn test_args_with_output_and_instruments() {
        let args = Args::parse_from([
            "test",
            "--midi-output",
            "Mock Device 1",
            "-i",
            "violin",
            "--instrument",
            "cello",
            "--tempo",
            "90",
        ]);
        assert_eq!(args.midi_output, Some("Mock Device 1".to_string()));
        assert_eq!(args.instruments, vec!["violin", "cello"]);
        assert_eq!(args.tempo, Some(90.0));
    }

    #[test]
    fn test_args_override_settings() {
        let args = Args::parse_from(["test", "--tempo", "140", "-i", "flute"]);
        let mut settings = Settings::default();
        args.apply_to(&mut settings);
        assert_eq!(settings.tempo, 140.0);
        assert_eq!(settings.instruments, vec!["flute"]);
        assert_eq!(settings.midi_output, None);
    }

    #[test]
    fn test_args_leave_unset_settings_alone() {
        let args = Args::parse_from(["test", "--dry-run"]);
        let mut settings = Settings::default();
        args.apply_to(&mut settings);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_valid_device_binding() {
        assert!(
            validate_device("Mock Device 1", &mock_devices()).is_ok(),
            "Valid device should be found in device list"
        );
        assert!(validate_device("Device 2", &mock_devices()).is_ok());
    }

    #[test]
    fn test_invalid_device_binding() {
        let error = validate_device("Nonexistent Device", &mock_devices())
            .expect_err("Invalid device should not be found in device list");
        assert!(error.contains("Nonexistent Device"));
        assert!(error.contains("  - Mock Device 2"));
    }
}

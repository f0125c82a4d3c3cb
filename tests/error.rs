use dns01_hook::ChallengeError;

#[test]
fn display_zone_not_found() {
    let err = ChallengeError::ZoneNotFound {
        domain: "s.example.com".into(),
    };
    assert_eq!(err.to_string(), "no zone found for domain: s.example.com");
}

#[test]
fn display_record_not_found() {
    let err = ChallengeError::RecordNotFound {
        fqdn: "_acme-challenge.example.com".into(),
    };
    assert_eq!(
        err.to_string(),
        "no record found to delete: _acme-challenge.example.com"
    );
}

#[test]
fn display_provider_is_verbatim() {
    let err = ChallengeError::Provider(" You already have another already existent".into());
    assert_eq!(err.to_string(), " You already have another already existent");
}

#[test]
fn display_propagation_timed_out() {
    let err = ChallengeError::PropagationTimedOut {
        fqdn: "_acme-challenge.example.com".into(),
        attempts: 30,
    };
    assert_eq!(
        err.to_string(),
        "TXT record _acme-challenge.example.com did not propagate after 30 attempts"
    );
}

#[test]
fn display_malformed_replay_input() {
    let err = ChallengeError::MalformedReplayInput("a,b,c".into());
    assert_eq!(
        err.to_string(),
        "malformed auth output, expected 'zoneId,recordFQDN': \"a,b,c\""
    );
}

#[test]
fn display_env_missing() {
    let err = ChallengeError::EnvMissing("CF_API_TOKEN".into());
    assert_eq!(err.to_string(), "environment variable missing: CF_API_TOKEN");
}

#[test]
fn display_command_not_found() {
    let err = ChallengeError::CommandNotFound("curl".into());
    assert_eq!(err.to_string(), "command not found: curl");
}

#[test]
fn interrupts() {
    assert!(ChallengeError::Cancelled.is_interrupt());
    assert!(ChallengeError::DeadlineExceeded.is_interrupt());
    assert!(!ChallengeError::Provider("x".into()).is_interrupt());
}

#[test]
fn from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err: ChallengeError = io_err.into();
    assert!(matches!(err, ChallengeError::Io(_)));
}

#[test]
fn from_json_error() {
    let json_err = serde_json::from_str::<Vec<u64>>("invalid").unwrap_err();
    let err: ChallengeError = json_err.into();
    assert!(matches!(err, ChallengeError::Json(_)));
}

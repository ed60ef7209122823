//! The digest batch job.
//!
//! One run pins a reference instant, fetches the window starting there,
//! normalizes the events, composes the digest and delivers it. The fetch runs
//! on a current-thread runtime; everything after it is synchronous. This is
//! the only layer that logs: normalizer and mailer hand back plain values.

use agendamail_core::TimeWindow;
use agendamail_mailer::{
    ComposedMessage, DeliveryOutcome, DeliveryReport, DigestRequest, MailTransport, Mailer,
    OutgoingMessage, SmtpMailTransport, Sleeper, compose_digest,
};
use agendamail_providers::google::GoogleProvider;
use agendamail_providers::{CalendarProvider, NormalizedBatch, RawEvent, normalize_batch};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::{ClientConfig, DeliveryConfig, ResolvedConfig};
use crate::error::{AppError, AppResult};

const BANNER_WIDTH: usize = 60;

/// A composed digest and the batch it was built from.
#[derive(Debug)]
pub struct PreparedDigest {
    pub fetched: usize,
    pub batch: NormalizedBatch,
    pub composed: ComposedMessage,
}

/// What a sending run did.
#[derive(Debug)]
pub struct RunSummary {
    pub fetched: usize,
    pub delivered_events: usize,
    pub rejected: usize,
    pub report: DeliveryReport,
}

/// Runs the job with the production provider and transport.
///
/// With `dry_run` the digest is printed to stdout instead of being sent.
pub fn execute(config: &ClientConfig, dry_run: bool) -> AppResult<()> {
    let reference = Utc::now();
    let banner = "=".repeat(BANNER_WIDTH);
    info!("{}", banner);
    info!("starting calendar digest job at {}", reference.to_rfc3339());
    info!("{}", banner);

    let settings = config.resolve(dry_run)?;
    info!(
        "configuration loaded: calendar {}, window {}h, zone {}",
        settings.google.calendar_id, settings.window_hours, settings.timezone
    );

    let provider = GoogleProvider::new(settings.google.clone());

    match settings.delivery {
        None => {
            let prepared = prepare(&provider, &settings, reference)?;
            println!("Subject: {}\n", prepared.composed.subject);
            print!("{}", prepared.composed.text_body);
            info!("dry run, digest not sent");
        }
        Some(ref delivery) => {
            let mailer = Mailer::new(SmtpMailTransport::new(delivery.smtp.clone()), delivery.retry);
            let summary = run_batch(&provider, &mailer, delivery, &settings, reference)?;
            info!("{}", banner);
            info!(
                "calendar digest job completed: {} events sent in {} attempt(s)",
                summary.delivered_events,
                summary.report.attempts.len()
            );
            info!("{}", banner);
        }
    }

    Ok(())
}

/// Drives `future` to completion on a current-thread runtime.
pub fn block_on<F: Future>(future: F) -> AppResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

/// Fetches the window of events.
pub fn fetch_events(provider: &dyn CalendarProvider, window: TimeWindow) -> AppResult<Vec<RawEvent>> {
    let events = block_on(provider.fetch_events(window))??;
    Ok(events)
}

/// Fetches, normalizes and composes.
pub fn prepare(
    provider: &dyn CalendarProvider,
    settings: &ResolvedConfig,
    reference: DateTime<Utc>,
) -> AppResult<PreparedDigest> {
    let window = TimeWindow::rolling_hours(reference, settings.window_hours)?;
    info!(
        "fetching events from {} between {} and {}",
        provider.name(),
        window.start.to_rfc3339(),
        window.end.to_rfc3339()
    );
    let raw = fetch_events(provider, window)?;
    info!("found {} event(s)", raw.len());

    let batch = normalize_batch(&raw, &settings.timezone, reference, settings.on_malformed)?;
    for rejected in &batch.rejected {
        warn!("skipping malformed event {}: {}", rejected.event_id, rejected.reason);
    }
    for (i, event) in batch.events.iter().enumerate() {
        info!(
            "  {}. {} - {} at {}",
            i + 1,
            event.title,
            event.date_label,
            event.time_label
        );
    }

    let composed = compose_digest(&DigestRequest {
        events: &batch.events,
        recipient_name: &settings.recipient_name,
        reference,
        timezone: settings.timezone,
        window_hours: settings.window_hours,
    });
    info!("email subject: {}", composed.subject);

    Ok(PreparedDigest {
        fetched: raw.len(),
        batch,
        composed,
    })
}

/// Sends `message` and logs every attempt.
pub fn deliver<T, S>(mailer: &Mailer<T, S>, message: &OutgoingMessage) -> AppResult<DeliveryReport>
where
    T: MailTransport,
    S: Sleeper,
{
    info!("sending digest to {}", message.to);
    let report = mailer.send(message);
    let max_attempts = mailer.policy().max_attempts();

    for attempt in &report.attempts {
        if !attempt.backoff.is_zero() {
            debug!("waited {:?} before attempt {}", attempt.backoff, attempt.number);
        }
        match attempt.error {
            None => info!("attempt {}/{} succeeded", attempt.number, max_attempts),
            Some(ref err) => warn!(
                "attempt {}/{} failed: {}",
                attempt.number, max_attempts, err
            ),
        }
    }

    match report.outcome {
        DeliveryOutcome::Sent => {
            info!("digest sent to {}", message.to);
            return Ok(report);
        }
        DeliveryOutcome::AuthFailed => {
            error!("SMTP authentication failed, check SMTP_USER and SMTP_PASSWORD");
        }
        DeliveryOutcome::TransportExhausted => {
            error!("failed to send digest after {} attempts", report.attempts.len());
        }
        DeliveryOutcome::Unclassified => {
            error!("digest delivery stopped by an unexpected error");
        }
    }

    Err(AppError::Delivery {
        outcome: report.outcome,
        detail: report
            .last_error()
            .map(ToString::to_string)
            .unwrap_or_default(),
    })
}

/// Runs a sending batch against any provider and transport.
pub fn run_batch<T, S>(
    provider: &dyn CalendarProvider,
    mailer: &Mailer<T, S>,
    delivery: &DeliveryConfig,
    settings: &ResolvedConfig,
    reference: DateTime<Utc>,
) -> AppResult<RunSummary>
where
    T: MailTransport,
    S: Sleeper,
{
    let prepared = prepare(provider, settings, reference)?;
    let message = OutgoingMessage::new(
        &delivery.from_name,
        &delivery.from_address,
        &delivery.recipient,
        prepared.composed,
    );
    let report = deliver(mailer, &message)?;

    Ok(RunSummary {
        fetched: prepared.fetched,
        delivered_events: prepared.batch.events.len(),
        rejected: prepared.batch.rejected.len(),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExitStatus;
    use agendamail_mailer::{MailSession, RetryPolicy, SmtpSecurity, TransportError};
    use agendamail_providers::google::GoogleConfig;
    use agendamail_providers::{
        BoxFuture, MalformedPolicy, ProviderError, ProviderResult, RawEventTime,
    };
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 5, 13, 0, 0).unwrap()
    }

    struct FixedProvider(ProviderResult<Vec<RawEvent>>);

    impl CalendarProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_events(&self, _window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
            let result = match &self.0 {
                Ok(events) => Ok(events.clone()),
                Err(err) => Err(ProviderError::new(err.code(), err.message())),
            };
            Box::pin(async move { result })
        }
    }

    struct Scripted(RefCell<VecDeque<Result<(), TransportError>>>);

    struct ScriptedSession(Result<(), TransportError>, Rc<RefCell<Vec<OutgoingMessage>>>);

    impl MailSession for ScriptedSession {
        fn send(&mut self, message: &OutgoingMessage) -> Result<(), TransportError> {
            self.1.borrow_mut().push(message.clone());
            self.0.clone()
        }
    }

    struct RecordingTransport {
        script: Scripted,
        outbox: Rc<RefCell<Vec<OutgoingMessage>>>,
    }

    impl RecordingTransport {
        fn new(script: Vec<Result<(), TransportError>>) -> Self {
            Self {
                script: Scripted(RefCell::new(script.into())),
                outbox: Rc::default(),
            }
        }
    }

    impl MailTransport for RecordingTransport {
        type Session = ScriptedSession;

        fn connect(&self) -> Result<ScriptedSession, TransportError> {
            let result = self.script.0.borrow_mut().pop_front().unwrap_or(Ok(()));
            Ok(ScriptedSession(result, Rc::clone(&self.outbox)))
        }
    }

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    fn timed(id: &str, title: &str, start: &str, end: &str) -> RawEvent {
        RawEvent::new(id, RawEventTime::date_time(start), RawEventTime::date_time(end))
            .with_summary(title)
    }

    fn sample_events() -> Vec<RawEvent> {
        vec![
            timed("evt-1", "Standup", "2025-02-05T14:00:00Z", "2025-02-05T14:30:00Z"),
            RawEvent::new("evt-bad", RawEventTime::default(), RawEventTime::default()),
            RawEvent::new(
                "evt-2",
                RawEventTime::date("2025-02-06"),
                RawEventTime::date("2025-02-07"),
            )
            .with_summary("Offsite"),
        ]
    }

    fn settings(policy: MalformedPolicy) -> ResolvedConfig {
        ResolvedConfig {
            timezone: Tz::America__New_York,
            window_hours: 48,
            google: GoogleConfig::new("/nonexistent/token.json"),
            on_malformed: policy,
            recipient_name: "Noah".into(),
            delivery: None,
        }
    }

    fn delivery() -> DeliveryConfig {
        DeliveryConfig {
            smtp: agendamail_mailer::SmtpSettings {
                host: "localhost".into(),
                port: 2525,
                security: SmtpSecurity::Plain,
                username: "digest@example.com".into(),
                password: "secret".into(),
                timeout: Duration::from_secs(1),
            },
            from_name: "Calendar Digest".into(),
            from_address: "digest@example.com".into(),
            recipient: "noah@example.com".into(),
            retry: RetryPolicy::default(),
        }
    }

    mod preparation {
        use super::*;

        #[test]
        fn skips_malformed_and_composes() {
            let provider = FixedProvider(Ok(sample_events()));
            let prepared = prepare(&provider, &settings(MalformedPolicy::Skip), reference()).unwrap();

            assert_eq!(prepared.fetched, 3);
            assert_eq!(prepared.batch.events.len(), 2);
            assert_eq!(prepared.batch.rejected.len(), 1);
            assert_eq!(prepared.batch.rejected[0].event_id, "evt-bad");
            assert_eq!(
                prepared.composed.subject,
                "Your Schedule - 2 Appointments in the Next 48 Hours"
            );
            assert!(
                prepared
                    .composed
                    .text_body
                    .contains("[9:00 AM - 9:30 AM] Standup")
            );
            assert!(prepared.composed.text_body.contains("Tomorrow, February 6"));
        }

        #[test]
        fn abort_policy_fails_the_batch() {
            let provider = FixedProvider(Ok(sample_events()));
            let err = prepare(&provider, &settings(MalformedPolicy::Abort), reference()).unwrap_err();
            assert!(matches!(err, AppError::Malformed(_)));
            assert_eq!(err.exit_status(), ExitStatus::Unclassified);
        }

        #[test]
        fn empty_window() {
            let provider = FixedProvider(Ok(Vec::new()));
            let prepared = prepare(&provider, &settings(MalformedPolicy::Skip), reference()).unwrap();
            assert_eq!(
                prepared.composed.subject,
                "Your Schedule - All Clear for the Next 48 Hours!"
            );
        }

        #[test]
        fn oversized_window_fails_before_fetching() {
            let provider = FixedProvider(Ok(sample_events()));
            let mut settings = settings(MalformedPolicy::Skip);
            settings.window_hours = u32::MAX;

            let err = prepare(&provider, &settings, reference()).unwrap_err();
            assert!(matches!(err, AppError::Window(_)));
            assert_eq!(err.exit_status(), ExitStatus::Config);
        }

        #[test]
        fn provider_errors_keep_their_exit_status() {
            let provider = FixedProvider(Err(ProviderError::missing_prerequisite("no token")));
            let err = prepare(&provider, &settings(MalformedPolicy::Skip), reference()).unwrap_err();
            assert_eq!(err.exit_status(), ExitStatus::MissingPrerequisite);
        }
    }

    mod sending {
        use super::*;

        #[test]
        fn sends_digest_after_transient_failure() {
            let transport = RecordingTransport::new(vec![
                Err(TransportError::Transport("connection reset".into())),
                Ok(()),
            ]);
            let outbox = Rc::clone(&transport.outbox);
            let mailer = Mailer::with_sleeper(transport, RetryPolicy::default(), NoSleep);
            let provider = FixedProvider(Ok(sample_events()));

            let summary = run_batch(
                &provider,
                &mailer,
                &delivery(),
                &settings(MalformedPolicy::Skip),
                reference(),
            )
            .unwrap();

            assert_eq!(summary.fetched, 3);
            assert_eq!(summary.delivered_events, 2);
            assert_eq!(summary.rejected, 1);
            assert_eq!(summary.report.outcome, DeliveryOutcome::Sent);
            assert_eq!(summary.report.attempts.len(), 2);

            let outbox = outbox.borrow();
            assert_eq!(outbox.len(), 2);
            assert_eq!(outbox[1].to, "noah@example.com");
            assert_eq!(outbox[1].from_name, "Calendar Digest");
            assert!(outbox[1].html_body.contains("Standup"));
        }

        #[test]
        fn auth_failure_exits_with_delivery_status() {
            let transport = RecordingTransport::new(vec![Err(TransportError::Authentication(
                "535 5.7.8 credentials rejected".into(),
            ))]);
            let mailer = Mailer::with_sleeper(transport, RetryPolicy::default(), NoSleep);
            let provider = FixedProvider(Ok(Vec::new()));

            let err = run_batch(
                &provider,
                &mailer,
                &delivery(),
                &settings(MalformedPolicy::Skip),
                reference(),
            )
            .unwrap_err();

            assert_eq!(err.exit_status(), ExitStatus::DeliveryFailed);
            match err {
                AppError::Delivery { outcome, detail } => {
                    assert_eq!(outcome, DeliveryOutcome::AuthFailed);
                    assert!(detail.contains("535"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn exhausted_transport() {
            let transport = RecordingTransport::new(vec![
                Err(TransportError::Transport("timeout".into()));
                3
            ]);
            let mailer = Mailer::with_sleeper(transport, RetryPolicy::default(), NoSleep);
            let message = OutgoingMessage {
                from_name: "Calendar Digest".into(),
                from_address: "digest@example.com".into(),
                to: "noah@example.com".into(),
                subject: "s".into(),
                html_body: "h".into(),
                text_body: "t".into(),
            };

            let err = deliver(&mailer, &message).unwrap_err();
            assert!(matches!(
                err,
                AppError::Delivery {
                    outcome: DeliveryOutcome::TransportExhausted,
                    ..
                }
            ));
        }
    }
}

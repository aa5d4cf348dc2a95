//! Blocking HTTP client for the remote training service.
//!
//! Wire payloads follow the Garmin Connect workout schema: nested step DTOs
//! with key-wrapped enums. Step targets resolve against the plan's zone
//! registry at push time; a name that no longer resolves fails that item,
//! not the whole push.

use std::cell::RefCell;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::sync::{RemoteService, SyncError, SyncRecord, SyncRecordStatus, SyncReport};
use crate::workouts::types::{EndCondition, SimpleStep, Sport, Step, StepType, Target, Workout};
use crate::zones::registry::{ZoneKind, ZoneRegistry};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for an already-authenticated session.
pub struct ConnectClient {
    http: Client,
    base_url: String,
    session_token: String,
    zones: ZoneRegistry,
    history: RefCell<Vec<SyncRecord>>,
}

impl ConnectClient {
    /// Create a client from a pre-authenticated session token and the zone
    /// registry used to resolve step targets at push time.
    pub fn new(
        base_url: impl Into<String>,
        session_token: impl Into<String>,
        zones: ZoneRegistry,
    ) -> Result<Self, SyncError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            session_token: session_token.into(),
            zones,
            history: RefCell::new(Vec::new()),
        })
    }

    /// Upload attempts made through this client.
    pub fn history(&self) -> Vec<SyncRecord> {
        self.history.borrow().clone()
    }

    fn record(&self, workout: &str, result: &Result<String, String>) {
        let (status, external_id, error_message) = match result {
            Ok(id) => (SyncRecordStatus::Completed, Some(id.clone()), None),
            Err(reason) => (SyncRecordStatus::Failed, None, Some(reason.clone())),
        };
        self.history.borrow_mut().push(SyncRecord {
            id: Uuid::new_v4(),
            workout: workout.to_string(),
            status,
            external_id,
            created_at: Utc::now(),
            error_message,
        });
    }

    fn get(&self, path: &str) -> Result<Value, SyncError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.session_token)
            .send()
            .map_err(map_transport_error)?;
        Self::parse_response(response)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, SyncError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.session_token)
            .json(body)
            .send()
            .map_err(map_transport_error)?;
        Self::parse_response(response)
    }

    fn delete_request(&self, path: &str) -> Result<(), SyncError> {
        let response = self
            .http
            .delete(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.session_token)
            .send()
            .map_err(map_transport_error)?;
        Self::parse_response(response).map(|_| ())
    }

    fn parse_response(response: reqwest::blocking::Response) -> Result<Value, SyncError> {
        let status = response.status();
        let body = response.text().map_err(map_transport_error)?;

        if let Some(err) = map_status(status, &body) {
            return Err(err);
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| SyncError::Api(format!("invalid response body: {}", e)))
    }

    /// Build the wire payload for one workout. Zone names resolve against
    /// the registry; an unresolvable name fails this workout only.
    fn workout_payload(&self, workout: &Workout) -> Result<Value, String> {
        let mut order = 1u32;
        let mut steps = Vec::new();
        for step in &workout.steps {
            steps.push(self.step_payload(step, workout.sport, &mut order)?);
        }

        Ok(json!({
            "workoutName": workout.name,
            "description": workout.description,
            "sportType": { "sportTypeKey": workout.sport.key() },
            // Totals over the flattened execution order.
            "estimatedDurationInSecs": workout.duration_seconds(),
            "estimatedDistanceInMeters": workout.distance_meters(),
            "workoutSegments": [{
                "segmentOrder": 1,
                "sportType": { "sportTypeKey": workout.sport.key() },
                "workoutSteps": steps,
            }],
        }))
    }

    fn step_payload(&self, step: &Step, sport: Sport, order: &mut u32) -> Result<Value, String> {
        match step {
            Step::Simple(simple) => self.simple_step_payload(simple, sport, order),
            Step::Repeat { count, steps } => {
                let step_order = *order;
                *order += 1;
                let mut children = Vec::new();
                for child in steps {
                    children.push(self.step_payload(child, sport, order)?);
                }
                Ok(json!({
                    "type": "RepeatGroupDTO",
                    "stepOrder": step_order,
                    "stepType": { "stepTypeKey": "repeat" },
                    "numberOfIterations": count,
                    "workoutSteps": children,
                }))
            }
        }
    }

    fn simple_step_payload(
        &self,
        step: &SimpleStep,
        sport: Sport,
        order: &mut u32,
    ) -> Result<Value, String> {
        let step_order = *order;
        *order += 1;

        let (condition_key, condition_value) = match step.end {
            EndCondition::LapButton => ("lap.button", Value::Null),
            EndCondition::Time { seconds } => ("time", json!(seconds)),
            EndCondition::Distance { meters } => ("distance", json!(meters)),
        };

        let (target_key, low, high) = match &step.target {
            Target::Open => ("no.target", Value::Null, Value::Null),
            Target::Zone { name } => {
                let (kind, min, max) = self
                    .resolve_zone(sport, name)
                    .map_err(|e| format!("step {}: {}", step_order, e))?;
                target_values(kind, min, max)
            }
            Target::Range { kind, min, max } => target_values(*kind, *min, *max),
        };

        Ok(json!({
            "type": "ExecutableStepDTO",
            "stepOrder": step_order,
            "stepType": { "stepTypeKey": step.step_type.key() },
            "description": step.description,
            "endCondition": { "conditionTypeKey": condition_key },
            "endConditionValue": condition_value,
            "targetType": { "workoutTargetTypeKey": target_key },
            "targetValueLow": low,
            "targetValueHigh": high,
        }))
    }

    /// Find a named zone in the sport's native table first, falling back to
    /// the shared heart-rate table.
    fn resolve_zone(
        &self,
        sport: Sport,
        name: &str,
    ) -> Result<(ZoneKind, f64, f64), crate::zones::registry::ZoneError> {
        let native_kind = match sport {
            Sport::Cycling => ZoneKind::Power,
            Sport::Running | Sport::Swimming => ZoneKind::Pace,
        };

        for kind in [native_kind, ZoneKind::HeartRate] {
            if self.zones.get(sport, kind, name).is_some() {
                let (min, max) = self.zones.resolve(sport, kind, name)?;
                return Ok((kind, min, max));
            }
        }
        // Not registered anywhere; report against the native scope.
        let (min, max) = self.zones.resolve(sport, native_kind, name)?;
        Ok((native_kind, min, max))
    }
}

/// Convert resolved bounds into wire target fields.
///
/// Paces cross the wire as metres per second, so the faster pace (smaller
/// scalar) becomes the high value. Open bounds clamp to the service's
/// conventional 0 / 9999 sentinels.
fn target_values(kind: ZoneKind, min: f64, max: f64) -> (&'static str, Value, Value) {
    let clamp = |v: f64, fallback: f64| {
        if v.is_finite() {
            v
        } else {
            fallback
        }
    };

    match kind {
        ZoneKind::Pace => {
            let slow = clamp(max, 3600.0);
            let fast = clamp(min, 1.0).max(1.0);
            ("pace.zone", json!(1000.0 / slow), json!(1000.0 / fast))
        }
        ZoneKind::HeartRate => (
            "heart.rate.zone",
            json!(clamp(min, 0.0)),
            json!(clamp(max, 9999.0)),
        ),
        ZoneKind::Power => (
            "power.zone",
            json!(clamp(min, 0.0)),
            json!(clamp(max, 9999.0)),
        ),
    }
}

fn map_transport_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::Transient(format!("request timed out: {}", err))
    } else {
        SyncError::Network(err.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> Option<SyncError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Some(SyncError::Auth(format!("{}: {}", status, body)))
    } else if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT {
        Some(SyncError::Transient(format!("{}: {}", status, body)))
    } else if !status.is_success() {
        Some(SyncError::Api(format!("{}: {}", status, body)))
    } else {
        None
    }
}

impl RemoteService for ConnectClient {
    fn pull(&self) -> Result<Vec<Workout>, SyncError> {
        tracing::info!("Pulling workouts from {}", self.base_url);
        let body = self.get("/workout-service/workouts")?;

        let items = body
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut workouts = Vec::new();
        for item in &items {
            match parse_remote_workout(item) {
                Some(workout) => workouts.push(workout),
                None => tracing::warn!("Skipping unparsable remote workout: {}", item),
            }
        }

        tracing::info!("Pulled {} workouts", workouts.len());
        Ok(workouts)
    }

    fn push(&self, workouts: &[Workout]) -> Result<SyncReport, SyncError> {
        tracing::info!("Pushing {} workouts to {}", workouts.len(), self.base_url);
        let mut report = SyncReport::default();

        for workout in workouts {
            let payload = match self.workout_payload(workout) {
                Ok(payload) => payload,
                Err(reason) => {
                    self.record(&workout.name, &Err(reason.clone()));
                    report.failed.push((workout.name.clone(), reason));
                    continue;
                }
            };

            match self.post("/workout-service/workout", &payload) {
                Ok(response) => {
                    let external_id = response
                        .get("workoutId")
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    self.record(&workout.name, &Ok(external_id));
                    report.succeeded.push(workout.name.clone());
                }
                // Auth failures are fatal: stop before touching more items.
                Err(SyncError::Auth(reason)) => return Err(SyncError::Auth(reason)),
                Err(err) => {
                    let reason = err.to_string();
                    self.record(&workout.name, &Err(reason.clone()));
                    report.failed.push((workout.name.clone(), reason));
                }
            }
        }

        tracing::info!(
            "Push finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn schedule(&self, workout_id: &str, date: NaiveDate) -> Result<SyncReport, SyncError> {
        tracing::info!("Scheduling workout {} on {}", workout_id, date);
        let body = json!({ "date": date.format("%Y-%m-%d").to_string() });

        match self.post(&format!("/workout-service/schedule/{}", workout_id), &body) {
            Ok(_) => Ok(SyncReport {
                succeeded: vec![workout_id.to_string()],
                failed: Vec::new(),
            }),
            Err(SyncError::Auth(reason)) => Err(SyncError::Auth(reason)),
            Err(err) => Ok(SyncReport {
                succeeded: Vec::new(),
                failed: vec![(workout_id.to_string(), err.to_string())],
            }),
        }
    }

    fn delete(&self, workout_id: &str) -> Result<(), SyncError> {
        tracing::info!("Deleting remote workout {}", workout_id);
        self.delete_request(&format!("/workout-service/workout/{}", workout_id))
    }

    fn unschedule(&self, schedule_id: &str) -> Result<(), SyncError> {
        tracing::info!("Removing calendar placement {}", schedule_id);
        self.delete_request(&format!("/workout-service/schedule/{}", schedule_id))
    }
}

/// Rebuild a workout from the service's JSON representation.
fn parse_remote_workout(value: &Value) -> Option<Workout> {
    let name = value.get("workoutName")?.as_str()?;
    let sport = value
        .get("sportType")
        .and_then(|v| v.get("sportTypeKey"))
        .and_then(Value::as_str)
        .and_then(Sport::from_key)
        .unwrap_or(Sport::Running);

    let mut workout = Workout::new(name, sport);
    workout.description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    let steps = value
        .get("workoutSegments")
        .and_then(Value::as_array)
        .and_then(|segments| segments.first())
        .and_then(|segment| segment.get("workoutSteps"))
        .or_else(|| value.get("workoutSteps"))
        .and_then(Value::as_array)?;

    for step in steps {
        workout.add_step(parse_remote_step(step)?);
    }

    Some(workout)
}

fn parse_remote_step(value: &Value) -> Option<Step> {
    if value.get("type").and_then(Value::as_str) == Some("RepeatGroupDTO") {
        let count = value.get("numberOfIterations")?.as_u64()? as u32;
        let children = value.get("workoutSteps")?.as_array()?;
        let steps = children
            .iter()
            .map(parse_remote_step)
            .collect::<Option<Vec<_>>>()?;
        return Step::repeat(count, steps).ok();
    }

    let step_type = value
        .get("stepType")
        .and_then(|v| v.get("stepTypeKey"))
        .and_then(Value::as_str)
        .and_then(StepType::from_key)
        .unwrap_or(StepType::Other);

    let end = match value
        .get("endCondition")
        .and_then(|v| v.get("conditionTypeKey"))
        .and_then(Value::as_str)
    {
        Some("time") => EndCondition::Time {
            seconds: value.get("endConditionValue")?.as_f64()? as u32,
        },
        Some("distance") => EndCondition::Distance {
            meters: value.get("endConditionValue")?.as_f64()? as u32,
        },
        _ => EndCondition::LapButton,
    };

    let target = match value
        .get("targetType")
        .and_then(|v| v.get("workoutTargetTypeKey"))
        .and_then(Value::as_str)
    {
        Some("pace.zone") => {
            let low_speed = value.get("targetValueLow").and_then(Value::as_f64)?;
            let high_speed = value.get("targetValueHigh").and_then(Value::as_f64)?;
            if low_speed > 0.0 && high_speed > 0.0 {
                Target::Range {
                    kind: ZoneKind::Pace,
                    min: (1000.0 / high_speed).round(),
                    max: (1000.0 / low_speed).round(),
                }
            } else {
                Target::Open
            }
        }
        Some("heart.rate.zone") => Target::Range {
            kind: ZoneKind::HeartRate,
            min: value.get("targetValueLow").and_then(Value::as_f64)?,
            max: value.get("targetValueHigh").and_then(Value::as_f64)?,
        },
        Some("power.zone") => Target::Range {
            kind: ZoneKind::Power,
            min: value.get("targetValueLow").and_then(Value::as_f64)?,
            max: value.get("targetValueHigh").and_then(Value::as_f64)?,
        },
        _ => Target::Open,
    };

    let mut step = SimpleStep::new(step_type, end).with_target(target);
    step.description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(Step::Simple(step))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ConnectClient {
        ConnectClient::new(
            "https://example.invalid",
            "token",
            ZoneRegistry::standard(),
        )
        .unwrap()
    }

    #[test]
    fn test_payload_preserves_order_and_nesting() {
        let mut workout = Workout::new("W01D02 Intervals", Sport::Running);
        workout.add_step(Step::Simple(SimpleStep::new(
            StepType::Warmup,
            EndCondition::Time { seconds: 600 },
        )));
        workout
            .add_repeat(
                4,
                vec![Step::Simple(SimpleStep::new(
                    StepType::Interval,
                    EndCondition::Distance { meters: 400 },
                ))],
            )
            .unwrap();

        let payload = client().workout_payload(&workout).unwrap();
        let steps = &payload["workoutSegments"][0]["workoutSteps"];

        assert_eq!(steps[0]["stepOrder"], 1);
        assert_eq!(steps[1]["type"], "RepeatGroupDTO");
        assert_eq!(steps[1]["numberOfIterations"], 4);
        assert_eq!(steps[1]["workoutSteps"][0]["stepOrder"], 3);
    }

    #[test]
    fn test_payload_resolves_zone_names() {
        let mut workout = Workout::new("W01D01 Tempo", Sport::Running);
        workout.add_step(Step::Simple(
            SimpleStep::new(StepType::Interval, EndCondition::Time { seconds: 1200 })
                .with_target(Target::Zone {
                    name: "Z4".to_string(),
                }),
        ));

        let payload = client().workout_payload(&workout).unwrap();
        let step = &payload["workoutSegments"][0]["workoutSteps"][0];

        assert_eq!(step["targetType"]["workoutTargetTypeKey"], "pace.zone");
        // Z4 is 5:00-4:30 min/km; 300 s/km is 3.333 m/s on the slow side.
        let low = step["targetValueLow"].as_f64().unwrap();
        assert!((low - 1000.0 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_zone_fails_single_workout() {
        let mut workout = Workout::new("W01D01 Ghost", Sport::Running);
        workout.add_step(Step::Simple(
            SimpleStep::new(StepType::Interval, EndCondition::Time { seconds: 60 }).with_target(
                Target::Zone {
                    name: "Z99".to_string(),
                },
            ),
        ));

        let err = client().workout_payload(&workout).unwrap_err();
        assert!(err.contains("Z99"));
    }

    #[test]
    fn test_push_reports_payload_failures_per_item() {
        let mut workout = Workout::new("W01D01 Ghost", Sport::Running);
        workout.add_step(Step::Simple(
            SimpleStep::new(StepType::Interval, EndCondition::Time { seconds: 60 }).with_target(
                Target::Zone {
                    name: "Z99".to_string(),
                },
            ),
        ));

        // The payload fails before any network traffic happens.
        let client = client();
        let report = client.push(&[workout]).unwrap();

        assert!(report.succeeded.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_complete());

        let history = client.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SyncRecordStatus::Failed);
    }

    #[test]
    fn test_status_classification() {
        let auth = map_status(StatusCode::UNAUTHORIZED, "").unwrap();
        assert!(matches!(auth, SyncError::Auth(_)));

        let transient = map_status(StatusCode::TOO_MANY_REQUESTS, "").unwrap();
        assert!(matches!(transient, SyncError::Transient(_)));

        let api = map_status(StatusCode::INTERNAL_SERVER_ERROR, "").unwrap();
        assert!(matches!(api, SyncError::Api(_)));

        assert!(map_status(StatusCode::OK, "").is_none());
    }

    #[test]
    fn test_remote_workout_round_trip() {
        let mut workout = Workout::new("W02D01 Pulled", Sport::Cycling);
        workout.add_step(Step::Simple(
            SimpleStep::new(StepType::Interval, EndCondition::Time { seconds: 300 })
                .with_target(Target::Range {
                    kind: ZoneKind::Power,
                    min: 220.0,
                    max: 235.0,
                }),
        ));

        let payload = client().workout_payload(&workout).unwrap();
        let parsed = parse_remote_workout(&payload).unwrap();

        assert_eq!(parsed.name, workout.name);
        assert_eq!(parsed.sport, workout.sport);
        assert_eq!(parsed.steps, workout.steps);
    }
}

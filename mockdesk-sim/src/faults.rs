//! Conditional fault injection
//!
//! A fault scenario is a named list of conditional error definitions.
//! Predicates are a tagged union rather than closures so scenarios stay
//! serializable, inspectable, and unit-testable in isolation.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

use crate::request::RequestProfile;

/// Predicate over an incoming request.
///
/// Pure function of method, path, header values, and declared body
/// length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FaultCondition {
    /// Matches every request
    Always,
    /// Matches when the method is one of the listed verbs
    MethodIn { methods: Vec<String> },
    /// Matches when the path contains the fragment
    PathContains { fragment: String },
    /// Matches when the path ends in a numeric segment divisible by
    /// the divisor. A cheap pseudo-random trigger: roughly 1/divisor
    /// of id-addressed requests fire.
    TrailingIdDivisibleBy { divisor: i64 },
    /// Matches when the Authorization header is absent or not a
    /// Bearer credential
    MissingOrMalformedAuth,
    /// Matches when the declared body length exceeds the threshold
    ContentLengthOver { bytes: u64 },
}

impl FaultCondition {
    pub fn matches(&self, profile: &RequestProfile) -> bool {
        match self {
            FaultCondition::Always => true,
            FaultCondition::MethodIn { methods } => methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(&profile.method)),
            FaultCondition::PathContains { fragment } => profile.path.contains(fragment),
            FaultCondition::TrailingIdDivisibleBy { divisor } => profile
                .trailing_id()
                .is_some_and(|id| *divisor != 0 && id % divisor == 0),
            FaultCondition::MissingOrMalformedAuth => !profile
                .header("authorization")
                .is_some_and(|value| value.starts_with("Bearer ") && value.len() > 7),
            FaultCondition::ContentLengthOver { bytes } => profile.content_length > *bytes,
        }
    }
}

/// A conditional rule mapping a request predicate to a manufactured
/// error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultDefinition {
    /// HTTP status of the manufactured response
    pub status: u16,

    /// Machine-readable error tag (e.g. "record_not_found")
    pub error_type: String,

    /// Human-readable description
    pub description: String,

    /// When this fault fires
    pub condition: FaultCondition,

    /// Optional structured detail payload echoed in the error body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A named group of fault definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultScenario {
    pub name: String,

    /// Notional trigger probability; kept for scenario inspection and
    /// report output
    pub trigger_probability: f64,

    /// Delay imposed before responding when a fault in this scenario
    /// fires
    #[serde(with = "humantime_serde::option", default)]
    pub backoff: Option<Duration>,

    /// Evaluated first to last; the first matching definition wins
    pub faults: Vec<FaultDefinition>,
}

/// A manufactured error response, ready to write out.
#[derive(Debug, Clone)]
pub struct ErrorSimulation {
    /// Scenario that produced the fault
    pub scenario: String,

    /// Error tag of the matched definition
    pub error_type: String,

    /// HTTP status to respond with
    pub status: u16,

    /// Serialized JSON error body
    pub body: String,

    /// Delay to impose before responding
    pub backoff: Option<Duration>,
}

/// Per-scenario occurrence counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioOccurrences {
    pub checks: u64,
    pub occurrences: u64,
    pub last_occurrence: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct ErrorTracker {
    by_scenario: HashMap<String, ScenarioOccurrences>,
}

impl ErrorTracker {
    fn record_check(&mut self, scenario: &str) {
        self.by_scenario.entry(scenario.to_string()).or_default().checks += 1;
    }

    fn record_occurrence(&mut self, scenario: &str) {
        let entry = self.by_scenario.entry(scenario.to_string()).or_default();
        entry.occurrences += 1;
        entry.last_occurrence = Some(Utc::now());
    }
}

/// Evaluates named fault scenarios against requests and manufactures
/// error responses.
pub struct FaultInjector {
    scenarios: RwLock<HashMap<String, FaultScenario>>,
    tracker: Mutex<ErrorTracker>,
}

impl FaultInjector {
    /// Create an injector loaded with the built-in scenario library.
    pub fn new() -> Self {
        let mut scenarios = HashMap::new();
        for scenario in builtin_scenarios() {
            scenarios.insert(scenario.name.clone(), scenario);
        }
        Self {
            scenarios: RwLock::new(scenarios),
            tracker: Mutex::new(ErrorTracker::default()),
        }
    }

    /// Evaluate one named scenario against a request.
    ///
    /// Definitions are checked in declaration order and the first
    /// whose predicate matches wins. Returns `None` when the scenario
    /// is unknown or nothing matches.
    pub fn simulate_error(
        &self,
        profile: &RequestProfile,
        scenario_name: &str,
    ) -> Option<ErrorSimulation> {
        let scenarios = self.scenarios.read();
        let scenario = scenarios.get(scenario_name)?;

        self.tracker.lock().record_check(scenario_name);

        let fault = scenario
            .faults
            .iter()
            .find(|fault| fault.condition.matches(profile))?;

        self.tracker.lock().record_occurrence(scenario_name);
        debug!(
            scenario = %scenario_name,
            status = fault.status,
            error_type = %fault.error_type,
            path = %profile.path,
            "injecting fault"
        );

        Some(ErrorSimulation {
            scenario: scenario_name.to_string(),
            error_type: fault.error_type.clone(),
            status: fault.status,
            body: render_error_body(fault),
            backoff: scenario.backoff,
        })
    }

    /// Register (or replace) a scenario.
    pub fn add_scenario(&self, scenario: FaultScenario) {
        self.scenarios
            .write()
            .insert(scenario.name.clone(), scenario);
    }

    /// Build a new scenario by concatenating the definition lists of
    /// existing scenarios, preserving part order. Returns `false` when
    /// any part is unknown.
    pub fn compose_scenarios(&self, name: &str, parts: &[&str]) -> bool {
        let mut scenarios = self.scenarios.write();

        let mut faults = Vec::new();
        let mut backoff: Option<Duration> = None;
        for part in parts {
            match scenarios.get(*part) {
                Some(scenario) => {
                    faults.extend(scenario.faults.iter().cloned());
                    backoff = backoff.or(scenario.backoff);
                }
                None => return false,
            }
        }

        scenarios.insert(
            name.to_string(),
            FaultScenario {
                name: name.to_string(),
                trigger_probability: 1.0,
                backoff,
                faults,
            },
        );
        true
    }

    /// Names of all registered scenarios, sorted.
    pub fn scenario_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scenarios.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Deep-copied, point-in-time view of the occurrence counters.
    pub fn occurrences(&self) -> BTreeMap<String, ScenarioOccurrences> {
        self.tracker
            .lock()
            .by_scenario
            .iter()
            .map(|(name, stats)| (name.clone(), stats.clone()))
            .collect()
    }

    /// Zero the occurrence counters.
    pub fn reset_occurrences(&self) {
        *self.tracker.lock() = ErrorTracker::default();
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a fault's error body, falling back to a hand-built
/// minimal JSON string rather than panicking.
pub fn render_error_body(fault: &FaultDefinition) -> String {
    let mut body = serde_json::Map::new();
    let mut error = serde_json::Map::new();
    error.insert("code".to_string(), fault.error_type.clone().into());
    error.insert("message".to_string(), fault.description.clone().into());
    if let Some(ref details) = fault.details {
        error.insert("details".to_string(), details.clone());
    }
    body.insert("error".to_string(), serde_json::Value::Object(error));

    serde_json::to_string(&serde_json::Value::Object(body)).unwrap_or_else(|_| {
        format!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"simulated fault\"}}}}",
            fault.error_type
        )
    })
}

/// The built-in scenario library, one scenario per fault category.
fn builtin_scenarios() -> Vec<FaultScenario> {
    vec![
        FaultScenario {
            name: "authentication".to_string(),
            trigger_probability: 1.0,
            backoff: None,
            faults: vec![
                FaultDefinition {
                    status: 401,
                    error_type: "unauthenticated".to_string(),
                    description: "The request lacks valid credentials".to_string(),
                    condition: FaultCondition::MissingOrMalformedAuth,
                    details: Some(serde_json::json!({"hint": "send a Bearer token"})),
                },
                FaultDefinition {
                    status: 403,
                    error_type: "forbidden".to_string(),
                    description: "The credentials do not permit writes".to_string(),
                    condition: FaultCondition::MethodIn {
                        methods: vec!["DELETE".to_string()],
                    },
                    details: Some(serde_json::json!({"required_scope": "write"})),
                },
            ],
        },
        FaultScenario {
            name: "rate-limit-hint".to_string(),
            trigger_probability: 0.2,
            backoff: None,
            faults: vec![FaultDefinition {
                status: 429,
                error_type: "rate_limited".to_string(),
                description: "Upstream throttled the request".to_string(),
                condition: FaultCondition::TrailingIdDivisibleBy { divisor: 5 },
                details: Some(serde_json::json!({"retry_after_seconds": 3})),
            }],
        },
        FaultScenario {
            name: "validation".to_string(),
            trigger_probability: 0.5,
            backoff: None,
            faults: vec![FaultDefinition {
                status: 422,
                error_type: "unprocessable_entity".to_string(),
                description: "One or more fields failed validation".to_string(),
                condition: FaultCondition::MethodIn {
                    methods: vec!["POST".to_string(), "PUT".to_string()],
                },
                details: Some(serde_json::json!({"fields": ["title", "locale"]})),
            }],
        },
        FaultScenario {
            name: "not-found".to_string(),
            trigger_probability: 0.1,
            backoff: None,
            faults: vec![FaultDefinition {
                status: 404,
                error_type: "record_not_found".to_string(),
                description: "The record vanished upstream".to_string(),
                condition: FaultCondition::TrailingIdDivisibleBy { divisor: 13 },
                details: None,
            }],
        },
        FaultScenario {
            name: "server-error".to_string(),
            trigger_probability: 0.1,
            backoff: None,
            faults: vec![
                FaultDefinition {
                    status: 500,
                    error_type: "internal_error".to_string(),
                    description: "The upstream service hit an unexpected condition".to_string(),
                    condition: FaultCondition::TrailingIdDivisibleBy { divisor: 7 },
                    details: None,
                },
                FaultDefinition {
                    status: 502,
                    error_type: "bad_gateway".to_string(),
                    description: "An intermediate proxy returned garbage".to_string(),
                    condition: FaultCondition::TrailingIdDivisibleBy { divisor: 11 },
                    details: None,
                },
            ],
        },
        FaultScenario {
            name: "network-timeout".to_string(),
            trigger_probability: 0.1,
            backoff: Some(Duration::from_millis(250)),
            faults: vec![
                FaultDefinition {
                    status: 503,
                    error_type: "service_unavailable".to_string(),
                    description: "The upstream service is temporarily overloaded".to_string(),
                    condition: FaultCondition::TrailingIdDivisibleBy { divisor: 3 },
                    details: Some(serde_json::json!({"retry_after_seconds": 30})),
                },
                FaultDefinition {
                    status: 504,
                    error_type: "gateway_timeout".to_string(),
                    description: "The upstream service did not answer in time".to_string(),
                    condition: FaultCondition::TrailingIdDivisibleBy { divisor: 9 },
                    details: None,
                },
            ],
        },
        FaultScenario {
            name: "oversized-content".to_string(),
            trigger_probability: 1.0,
            backoff: None,
            faults: vec![FaultDefinition {
                status: 413,
                error_type: "payload_too_large".to_string(),
                description: "The request body exceeds the accepted size".to_string(),
                condition: FaultCondition::ContentLengthOver {
                    bytes: 512 * 1024,
                },
                details: Some(serde_json::json!({"max_bytes": 512 * 1024})),
            }],
        },
        FaultScenario {
            name: "write-conflict".to_string(),
            trigger_probability: 0.25,
            backoff: None,
            faults: vec![FaultDefinition {
                status: 409,
                error_type: "conflict".to_string(),
                description: "The record was modified by another editor".to_string(),
                condition: FaultCondition::MethodIn {
                    methods: vec!["PUT".to_string()],
                },
                details: Some(serde_json::json!({"resolution": "refetch and retry"})),
            }],
        },
    ]
}

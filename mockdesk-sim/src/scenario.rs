//! Behavior-set catalog and runtime scenario switching
//!
//! A behavior set bundles a baseline error rate, latency bounds, named
//! fault patterns, and canned handler overrides. The manager holds the
//! catalog and the active selector under one reader/writer lock;
//! built-in sets are immutable.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::faults::{FaultCondition, FaultDefinition};
use crate::request::RequestProfile;

/// Name of the behavior set every manager starts on and reverts to.
pub const BASELINE: &str = "baseline";

/// A canned response substituted for the real handler when the request
/// path contains the override's key fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerOverride {
    pub status: u16,
    pub body: serde_json::Value,
}

/// A named bundle of simulated backend behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorSet {
    pub name: String,

    /// Probability of injecting a generic server error on any request
    pub error_rate: f64,

    /// Lower latency bound applied when no fault matches
    #[serde(with = "humantime_serde")]
    pub min_latency: Duration,

    /// Upper latency bound applied when no fault matches
    #[serde(with = "humantime_serde")]
    pub max_latency: Duration,

    /// Named fault patterns; checked before latency bounds apply
    pub fault_patterns: BTreeMap<String, FaultDefinition>,

    /// Path fragment to canned-response overrides
    pub handler_overrides: BTreeMap<String, HandlerOverride>,
}

impl BehaviorSet {
    /// The latency range this set imposes on unfaulted requests.
    pub fn latency_range(&self) -> (Duration, Duration) {
        (self.min_latency, self.max_latency)
    }

    /// First handler override whose fragment appears in the path.
    pub fn match_override(&self, profile: &RequestProfile) -> Option<&HandlerOverride> {
        self.handler_overrides
            .iter()
            .find(|(fragment, _)| profile.path.contains(fragment.as_str()))
            .map(|(_, canned)| canned)
    }

    /// First fault pattern (in name order) whose condition matches.
    ///
    /// A match short-circuits latency injection for the request.
    pub fn match_fault(&self, profile: &RequestProfile) -> Option<&FaultDefinition> {
        self.fault_patterns
            .values()
            .find(|fault| fault.condition.matches(profile))
    }
}

/// Scenario management errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("unknown scenario: {0}")]
    Unknown(String),

    #[error("scenario '{0}' is built in and cannot be modified")]
    BuiltinImmutable(String),
}

struct CatalogState {
    catalog: HashMap<String, BehaviorSet>,
    active: String,
}

/// Catalog of behavior sets plus the active-scenario selector.
pub struct ScenarioManager {
    state: RwLock<CatalogState>,
    builtins: HashSet<String>,
}

impl ScenarioManager {
    /// Create a manager preloaded with the built-in behavior sets,
    /// with `baseline` active.
    pub fn new() -> Self {
        let mut catalog = HashMap::new();
        let mut builtins = HashSet::new();
        for set in builtin_behavior_sets() {
            builtins.insert(set.name.clone());
            catalog.insert(set.name.clone(), set);
        }
        Self {
            state: RwLock::new(CatalogState {
                catalog,
                active: BASELINE.to_string(),
            }),
            builtins,
        }
    }

    /// Name of the active behavior set.
    pub fn get_scenario(&self) -> String {
        self.state.read().active.clone()
    }

    /// Copy of the active behavior set.
    pub fn active_details(&self) -> BehaviorSet {
        let state = self.state.read();
        state
            .catalog
            .get(&state.active)
            .cloned()
            .unwrap_or_else(|| baseline_set())
    }

    /// Switch the active behavior set. Fails when the name is not
    /// registered.
    pub fn set_scenario(&self, name: &str) -> Result<(), ScenarioError> {
        let mut state = self.state.write();
        if !state.catalog.contains_key(name) {
            return Err(ScenarioError::Unknown(name.to_string()));
        }
        info!(from = %state.active, to = %name, "switching behavior scenario");
        state.active = name.to_string();
        Ok(())
    }

    /// Names of all registered behavior sets, sorted.
    pub fn available_scenarios(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().catalog.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register a custom behavior set. Built-in names are protected.
    pub fn add_custom_scenario(&self, set: BehaviorSet) -> Result<(), ScenarioError> {
        if self.builtins.contains(&set.name) {
            return Err(ScenarioError::BuiltinImmutable(set.name));
        }
        self.state.write().catalog.insert(set.name.clone(), set);
        Ok(())
    }

    /// Remove a custom behavior set. Removing the active set reverts
    /// the selector to `baseline`.
    pub fn remove_scenario(&self, name: &str) -> Result<(), ScenarioError> {
        if self.builtins.contains(name) {
            return Err(ScenarioError::BuiltinImmutable(name.to_string()));
        }
        let mut state = self.state.write();
        if state.catalog.remove(name).is_none() {
            return Err(ScenarioError::Unknown(name.to_string()));
        }
        if state.active == name {
            info!(removed = %name, "active scenario removed, reverting to baseline");
            state.active = BASELINE.to_string();
        }
        Ok(())
    }

    /// Copy of a named behavior set, if registered.
    pub fn scenario_details(&self, name: &str) -> Option<BehaviorSet> {
        self.state.read().catalog.get(name).cloned()
    }
}

impl Default for ScenarioManager {
    fn default() -> Self {
        Self::new()
    }
}

fn baseline_set() -> BehaviorSet {
    BehaviorSet {
        name: BASELINE.to_string(),
        error_rate: 0.0,
        min_latency: Duration::from_millis(20),
        max_latency: Duration::from_millis(80),
        fault_patterns: BTreeMap::new(),
        handler_overrides: BTreeMap::new(),
    }
}

fn builtin_behavior_sets() -> Vec<BehaviorSet> {
    let mut sets = vec![baseline_set()];

    sets.push(BehaviorSet {
        name: "high-latency".to_string(),
        error_rate: 0.0,
        min_latency: Duration::from_millis(800),
        max_latency: Duration::from_millis(2500),
        fault_patterns: BTreeMap::new(),
        handler_overrides: BTreeMap::new(),
    });

    sets.push(BehaviorSet {
        name: "unreliable".to_string(),
        error_rate: 0.2,
        min_latency: Duration::from_millis(50),
        max_latency: Duration::from_millis(400),
        fault_patterns: BTreeMap::from([
            (
                "flaky-backend".to_string(),
                FaultDefinition {
                    status: 500,
                    error_type: "internal_error".to_string(),
                    description: "The backend fell over mid-request".to_string(),
                    condition: FaultCondition::TrailingIdDivisibleBy { divisor: 4 },
                    details: None,
                },
            ),
            (
                "flaky-proxy".to_string(),
                FaultDefinition {
                    status: 502,
                    error_type: "bad_gateway".to_string(),
                    description: "A proxy hop returned an invalid response".to_string(),
                    condition: FaultCondition::TrailingIdDivisibleBy { divisor: 7 },
                    details: None,
                },
            ),
        ]),
        handler_overrides: BTreeMap::new(),
    });

    sets.push(BehaviorSet {
        name: "rate-limited".to_string(),
        error_rate: 0.0,
        min_latency: Duration::from_millis(20),
        max_latency: Duration::from_millis(100),
        fault_patterns: BTreeMap::from([(
            "throttle-everything".to_string(),
            FaultDefinition {
                status: 429,
                error_type: "rate_limited".to_string(),
                description: "The simulated backend is shedding load".to_string(),
                condition: FaultCondition::Always,
                details: Some(serde_json::json!({"retry_after_seconds": 5})),
            },
        )]),
        handler_overrides: BTreeMap::new(),
    });

    sets.push(BehaviorSet {
        name: "auth-failure".to_string(),
        error_rate: 0.0,
        min_latency: Duration::from_millis(20),
        max_latency: Duration::from_millis(80),
        fault_patterns: BTreeMap::from([(
            "expired-token".to_string(),
            FaultDefinition {
                status: 401,
                error_type: "unauthenticated".to_string(),
                description: "The access token has expired".to_string(),
                condition: FaultCondition::Always,
                details: Some(serde_json::json!({"hint": "refresh the token"})),
            },
        )]),
        handler_overrides: BTreeMap::new(),
    });

    sets.push(BehaviorSet {
        name: "partial-outage".to_string(),
        error_rate: 0.05,
        min_latency: Duration::from_millis(100),
        max_latency: Duration::from_millis(600),
        fault_patterns: BTreeMap::from([(
            "translations-down".to_string(),
            FaultDefinition {
                status: 503,
                error_type: "service_unavailable".to_string(),
                description: "The translation subsystem is offline".to_string(),
                condition: FaultCondition::PathContains {
                    fragment: "translations".to_string(),
                },
                details: Some(serde_json::json!({"retry_after_seconds": 120})),
            },
        )]),
        handler_overrides: BTreeMap::new(),
    });

    sets.push(BehaviorSet {
        name: "slow-subresource".to_string(),
        error_rate: 0.0,
        min_latency: Duration::from_millis(600),
        max_latency: Duration::from_millis(1800),
        fault_patterns: BTreeMap::new(),
        handler_overrides: BTreeMap::new(),
    });

    sets.push(BehaviorSet {
        name: "strict-validation".to_string(),
        error_rate: 0.0,
        min_latency: Duration::from_millis(20),
        max_latency: Duration::from_millis(80),
        fault_patterns: BTreeMap::from([(
            "reject-writes".to_string(),
            FaultDefinition {
                status: 422,
                error_type: "unprocessable_entity".to_string(),
                description: "Strict validation rejected the payload".to_string(),
                condition: FaultCondition::MethodIn {
                    methods: vec!["POST".to_string(), "PUT".to_string()],
                },
                details: Some(serde_json::json!({"fields": ["title", "locale", "body"]})),
            },
        )]),
        handler_overrides: BTreeMap::new(),
    });

    sets.push(BehaviorSet {
        name: "data-corruption".to_string(),
        error_rate: 0.0,
        min_latency: Duration::from_millis(20),
        max_latency: Duration::from_millis(80),
        fault_patterns: BTreeMap::new(),
        handler_overrides: BTreeMap::from([(
            "articles".to_string(),
            HandlerOverride {
                status: 200,
                body: serde_json::json!({
                    "article": {
                        "id": "not-a-number",
                        "title": null,
                        "locale": 42
                    }
                }),
            },
        )]),
    });

    sets
}

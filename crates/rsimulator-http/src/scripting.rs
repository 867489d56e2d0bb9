//! Rhai scripts run around each lookup.
//!
//! Scripts are looked up next to the templates and re-read on every call, so
//! they can be edited while the simulator runs:
//!
//! - `<root>/global_request.rhai` runs before matching. Returning a string
//!   answers the request with it and skips matching.
//! - `<candidate>.rhai` (the matched `<name>Request.<ext>` with
//!   `Request.<ext>` replaced by `.rhai`) runs after a match, followed by
//!   `<root>/global_response.rhai`. Returning a string replaces the response.
//!
//! Every script sees a `lookup` map (`root`, `relative_path`, `request`,
//! `content_type`). Response scripts also see `matched` (`candidate_path`,
//! `candidate`, `response_path`, `response_raw`, `response`) and `response`,
//! the body as produced so far. Returning `()` leaves things unchanged.

use std::path::{Path, PathBuf};

use rhai::{Dynamic, Engine, Scope};
use rsimulator_core::{CoreError, Hooks, Lookup, Match};
use serde::Serialize;
use tracing::debug;

const GLOBAL_REQUEST_SCRIPT: &str = "global_request.rhai";
const GLOBAL_RESPONSE_SCRIPT: &str = "global_response.rhai";

/// Upper bound on operations per script run
const MAX_OPERATIONS: u64 = 1_000_000;

pub struct RhaiHooks {
    root: PathBuf,
    engine: Engine,
}

impl RhaiHooks {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_expr_depths(64, 64);
        Self {
            root: root.into(),
            engine,
        }
    }

    fn run(&self, script: &Path, scope: &mut Scope) -> Result<Option<String>, CoreError> {
        let source = match std::fs::read_to_string(script) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Script {} does not exist", script.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(CoreError::Hook(format!(
                    "Failed to read script {}: {e}",
                    script.display()
                )))
            }
        };

        debug!("Executing script {}", script.display());
        let result: Dynamic = self
            .engine
            .eval_with_scope(scope, &source)
            .map_err(|e| CoreError::Hook(format!("Script {} failed: {e}", script.display())))?;

        if result.is_unit() {
            return Ok(None);
        }
        let type_name = result.type_name();
        result.into_string().map(Some).map_err(|_| {
            CoreError::Hook(format!(
                "Script {} must return a string or (), got {type_name}",
                script.display()
            ))
        })
    }
}

impl Hooks for RhaiHooks {
    fn before_lookup(&self, lookup: &Lookup) -> Result<Option<String>, CoreError> {
        let mut scope = Scope::new();
        scope.push_dynamic("lookup", to_dynamic(lookup)?);
        self.run(&self.root.join(GLOBAL_REQUEST_SCRIPT), &mut scope)
    }

    fn after_match(
        &self,
        lookup: &Lookup,
        matched: &Match,
        mut response: String,
    ) -> Result<String, CoreError> {
        let mut scripts = Vec::with_capacity(2);
        if let Some(local) = local_script(&matched.candidate_path) {
            scripts.push(local);
        }
        scripts.push(self.root.join(GLOBAL_RESPONSE_SCRIPT));

        for script in scripts {
            let mut scope = Scope::new();
            scope.push_dynamic("lookup", to_dynamic(lookup)?);
            scope.push_dynamic("matched", to_dynamic(matched)?);
            scope.push("response", response.clone());
            if let Some(replaced) = self.run(&script, &mut scope)? {
                response = replaced;
            }
        }
        Ok(response)
    }
}

/// `<dir>/<name>Request.<ext>` becomes `<dir>/<name>.rhai`.
fn local_script(candidate_path: &Path) -> Option<PathBuf> {
    let file_name = candidate_path.file_name()?.to_str()?;
    let (stem, extension) = file_name.rsplit_once("Request.")?;
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_lowercase()) {
        return None;
    }
    Some(candidate_path.with_file_name(format!("{stem}.rhai")))
}

fn to_dynamic<T: Serialize>(value: &T) -> Result<Dynamic, CoreError> {
    rhai::serde::to_dynamic(value)
        .map_err(|e| CoreError::Hook(format!("Failed to expose value to script: {e}")))
}

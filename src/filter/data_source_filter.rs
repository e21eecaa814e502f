use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error_handling::types::{ConfigError, UnresolvedCaptureError};
use crate::filter::key::Key;
use crate::filter::pattern::Pattern;
use crate::storage::types::ConnectionUri;

static CAPTURE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([1-9])").expect("capture reference regex"));
static ALIAS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("alias name regex"));

/// One `pattern=target` line of the filter configuration.
#[derive(Debug, Clone)]
pub struct FilterRule {
    pattern: Pattern,
    target: ConnectionUri,
    references: Vec<usize>,
    line: Option<usize>,
}

impl FilterRule {
    /// Builds a rule. `line` is the configuration line, `None` for the
    /// synthetic default rule.
    pub fn new(pattern: &str, target: &str, line: Option<usize>) -> Result<Self, ConfigError> {
        let pattern = Pattern::parse(pattern)?;
        let target = ConnectionUri::parse(target)
            .map_err(|e| ConfigError::InvalidUri(format!("'{}': {}", target, e)))?;
        let mut references: Vec<usize> = CAPTURE_REFERENCE
            .captures_iter(target.location())
            .filter_map(|c| c[1].parse().ok())
            .collect();
        references.sort_unstable();
        references.dedup();
        if let Some(bad) = references.iter().find(|r| **r > pattern.capture_count()) {
            return Err(ConfigError::BadCaptureReference(format!(
                "'{}' refers to ${} but pattern '{}' has {} wildcard(s)",
                target,
                bad,
                pattern,
                pattern.capture_count()
            )));
        }
        Ok(Self {
            pattern,
            target,
            references,
            line,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The target as written, with capture references left in place.
    pub fn target(&self) -> &ConnectionUri {
        &self.target
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Capture indexes (1 based) the target refers to.
    pub fn references(&self) -> &[usize] {
        &self.references
    }

    /// Returns the target for `key` if this rule matches it.
    pub fn resolve(&self, key: &Key) -> Option<ConnectionUri> {
        let bindings: Vec<Option<String>> =
            self.pattern.captures(key)?.into_iter().map(Some).collect();
        Some(self.instantiate(&bindings))
    }

    fn instantiate(&self, bindings: &[Option<String>]) -> ConnectionUri {
        if self.references.is_empty() {
            return self.target.clone();
        }
        let location = CAPTURE_REFERENCE.replace_all(self.target.location(), |c: &Captures| {
            c[1].parse::<usize>()
                .ok()
                .and_then(|i| bindings.get(i - 1).cloned().flatten())
                .map(|value| escape_capture(&value))
                .unwrap_or_default()
        });
        self.target.with_location(location.into_owned())
    }
}

/// Percent-encodes the characters that would let a captured key segment
/// leave its place in the location: path separators, drive colons and a
/// leading `~`. `%` itself is encoded so distinct values stay distinct.
fn escape_capture(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '\\' => out.push_str("%5C"),
            ':' => out.push_str("%3A"),
            '~' if i == 0 => out.push_str("%7E"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.pattern, self.target)
    }
}

/// Routes keys to connection URIs.
///
/// Rules are tried in declaration order and the first match wins. The rule
/// list always ends up containing exactly one bare `**` rule, so every key
/// has a destination.
#[derive(Debug, Clone)]
pub struct DataSourceFilter {
    rules: Vec<FilterRule>,
    catch_all: usize,
}

impl DataSourceFilter {
    pub fn new(configuration: &str, default_uri: &str) -> Result<Self, ConfigError> {
        let default_rule = FilterRule::new("**", default_uri, None)?;
        let mut aliases: HashMap<String, String> = HashMap::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut rules: Vec<FilterRule> = Vec::new();
        let mut catch_all: Option<usize> = None;

        for (n, raw) in configuration.lines().enumerate() {
            let line = n + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') || text.starts_with(';') {
                continue;
            }
            let (lhs, rhs) = text.split_once('=').ok_or_else(|| ConfigError::MalformedRule {
                line,
                reason: format!("'{}' is missing '='", text),
            })?;
            let (lhs, rhs) = (lhs.trim(), rhs.trim());
            if rhs.is_empty() {
                return Err(ConfigError::MalformedRule {
                    line,
                    reason: format!("'{}' has no connection URI", lhs),
                });
            }

            if let Some(name) = lhs.strip_prefix('$') {
                if !ALIAS_NAME.is_match(name) {
                    return Err(ConfigError::MalformedRule {
                        line,
                        reason: format!("'{}' is not a valid alias name", lhs),
                    });
                }
                ConnectionUri::parse(rhs)
                    .map_err(|e| ConfigError::InvalidUri(format!("line {}: {}", line, e)))?;
                if aliases.insert(name.to_string(), rhs.to_string()).is_some() {
                    warn!("Alias ${} redefined on line {}", name, line);
                }
                continue;
            }

            let target = match rhs.strip_prefix('$') {
                Some(name) if ALIAS_NAME.is_match(name) => aliases
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownAlias(format!("line {}: ${}", line, name)))?,
                _ => rhs.to_string(),
            };
            let rule = FilterRule::new(lhs, &target, Some(line))?;
            let canonical = rule.pattern().to_string();

            if let Some(catch_line) = catch_all.and_then(|i| rules.get(i)).and_then(FilterRule::line) {
                if rule.pattern().is_catch_all() {
                    return Err(ConfigError::MalformedRule {
                        line,
                        reason: format!("a '**' rule is already defined on line {}", catch_line),
                    });
                }
                warn!(
                    "Filter rule on line {} can never match, '**' on line {} catches every key",
                    line, catch_line
                );
            } else if let Some(first) = seen.get(&canonical) {
                warn!(
                    "Filter pattern '{}' on line {} is shadowed by line {}",
                    canonical, line, first
                );
            }
            seen.entry(canonical).or_insert(line);
            if rule.pattern().is_catch_all() {
                catch_all = Some(rules.len());
            }
            rules.push(rule);
        }

        let catch_all = match catch_all {
            Some(index) => index,
            None => {
                rules.push(default_rule);
                rules.len() - 1
            }
        };
        debug!("Filter built with {} rule(s)", rules.len());
        Ok(Self { rules, catch_all })
    }

    /// Effective rules in evaluation order, including the synthetic default.
    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// The connection owning `key`: the target of the first matching rule.
    pub fn resolve(&self, key: &Key) -> ConnectionUri {
        self.rules
            .iter()
            .find_map(|rule| rule.resolve(key))
            .unwrap_or_else(|| {
                let whole = vec![Some(key.to_string())];
                self.rules[self.catch_all].instantiate(&whole)
            })
    }

    /// Every connection that could hold a key at or below `prefix`, in rule
    /// order and without duplicates.
    ///
    /// Fails when a candidate rule's target refers to a capture whose value
    /// is not fixed by the prefix; the set of connections could otherwise be
    /// unbounded.
    pub fn resolve_all(&self, prefix: &Key) -> Result<Vec<ConnectionUri>, UnresolvedCaptureError> {
        let mut uris: Vec<ConnectionUri> = Vec::new();
        for rule in &self.rules {
            if !rule.pattern().is_compatible_with(prefix) {
                continue;
            }
            let bindings = rule.pattern().static_bindings(prefix);
            for reference in rule.references() {
                if bindings.get(reference - 1).cloned().flatten().is_none() {
                    return Err(UnresolvedCaptureError {
                        namespace: prefix.to_string(),
                        rule: rule.to_string(),
                        capture: *reference,
                    });
                }
            }
            let uri = rule.instantiate(&bindings);
            if !uris.contains(&uri) {
                uris.push(uri);
            }
        }
        Ok(uris)
    }
}

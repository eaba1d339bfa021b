//! Compiled route tree

use contracts::{ContractError, Event, FieldPath, RouteConfig};

use crate::predicate::Predicate;

/// One node of the routing tree
#[derive(Debug, Clone)]
pub struct Route {
    label: String,
    drops: Vec<Predicate>,
    matches: Vec<Predicate>,
    receivers: Vec<String>,
    children: Vec<Route>,
}

/// Receivers selected for one event
#[derive(Debug, Default)]
pub struct Selection<'a> {
    /// Receiver names in pre-order, duplicates kept
    pub receivers: Vec<&'a str>,
    /// Predicates that could not be evaluated
    pub errors: Vec<FieldPath>,
}

impl Route {
    /// Compile the tree rooted at `config`, labelled `label`
    pub fn compile(config: &RouteConfig, label: &str) -> Result<Self, ContractError> {
        let drops = config
            .drop
            .iter()
            .enumerate()
            .map(|(i, p)| Predicate::compile(p, &format!("{label}.drop[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        let matches = config
            .matches
            .iter()
            .enumerate()
            .map(|(i, p)| Predicate::compile(p, &format!("{label}.match[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        let children = config
            .routes
            .iter()
            .enumerate()
            .map(|(i, child)| Self::compile(child, &format!("{label}.routes[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            label: label.to_string(),
            drops,
            matches,
            receivers: config.receivers.clone(),
            children,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Every `(node label, receiver)` pair in the tree
    pub fn references(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        self.visit_references(&mut out);
        out
    }

    fn visit_references<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        out.extend(self.receivers.iter().map(|r| (self.label.as_str(), r.as_str())));
        for child in &self.children {
            child.visit_references(out);
        }
    }

    /// Walk the tree for one event
    pub fn select(&self, event: &Event) -> Selection<'_> {
        let mut selection = Selection::default();
        self.collect(event, &mut selection);
        selection
    }

    fn collect<'a>(&'a self, event: &Event, out: &mut Selection<'a>) {
        // Drops first; an unevaluable drop does not drop
        for drop in &self.drops {
            match drop.evaluate(event) {
                Ok(true) => return,
                Ok(false) => {}
                Err(path) => out.errors.push(path.clone()),
            }
        }

        for matcher in &self.matches {
            match matcher.evaluate(event) {
                Ok(true) => {}
                Ok(false) => return,
                Err(path) => {
                    out.errors.push(path.clone());
                    return;
                }
            }
        }

        out.receivers.extend(self.receivers.iter().map(String::as_str));
        for child in &self.children {
            child.collect(event, out);
        }
    }
}

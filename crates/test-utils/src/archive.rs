//! Scripted in-memory archive.
//!
//! [`ScriptedArchive`] implements [`Retriever`] over a set of published
//! cycles and canned fetch responses, and records every call so tests can
//! assert on the probe sequence. Clones share their call logs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use labeled_grid::GridDataset;
use nwp_source::{ProbeRequest, RetrievalError, RetrievalRequest, Retrieved, Retriever};

use crate::generators::{forecast_grid, nowcast_grid};

#[derive(Debug, Clone)]
enum Response {
    Single(GridDataset),
    Multiple(Vec<GridDataset>),
    /// Build a grid shaped after each request
    Generated(Vec<String>),
}

/// In-memory [`Retriever`] with scripted behavior.
#[derive(Debug, Clone, Default)]
pub struct ScriptedArchive {
    /// cycle -> last published lead hour
    published: BTreeMap<DateTime<Utc>, u32>,
    response: Option<Response>,
    probe_failure: Option<String>,
    empty_inventory: bool,
    probes: Rc<RefCell<Vec<ProbeRequest>>>,
    requests: Rc<RefCell<Vec<RetrievalRequest>>>,
}

impl ScriptedArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `cycle` with lead times up to `max_lead` hours.
    pub fn publish(mut self, cycle: DateTime<Utc>, max_lead: u32) -> Self {
        self.published.insert(cycle, max_lead);
        self
    }

    /// Return `grid` for every fetch.
    pub fn serve(mut self, grid: GridDataset) -> Self {
        self.response = Some(Response::Single(grid));
        self
    }

    /// Return several incompatible datasets for every fetch.
    pub fn serve_many(mut self, grids: Vec<GridDataset>) -> Self {
        self.response = Some(Response::Multiple(grids));
        self
    }

    /// Build the fetched grid from the request using the generators.
    pub fn serve_generated(mut self, variables: &[&str]) -> Self {
        self.response = Some(Response::Generated(
            variables.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    /// Fail every probe with a backend error.
    pub fn fail_probes(mut self, message: &str) -> Self {
        self.probe_failure = Some(message.to_string());
        self
    }

    /// Report an empty index for every request.
    pub fn with_empty_inventory(mut self) -> Self {
        self.empty_inventory = true;
        self
    }

    /// Every probe received so far.
    pub fn probes(&self) -> Vec<ProbeRequest> {
        self.probes.borrow().clone()
    }

    /// Cycles probed so far, in order.
    pub fn probed_cycles(&self) -> Vec<DateTime<Utc>> {
        self.probes.borrow().iter().map(|p| p.cycle).collect()
    }

    /// Every fetch request received so far.
    pub fn requests(&self) -> Vec<RetrievalRequest> {
        self.requests.borrow().clone()
    }
}

impl Retriever for ScriptedArchive {
    type Grid = GridDataset;

    fn exists(&self, probe: &ProbeRequest) -> Result<bool, RetrievalError> {
        self.probes.borrow_mut().push(probe.clone());
        if let Some(message) = &self.probe_failure {
            return Err(RetrievalError::Backend(message.clone()));
        }
        Ok(self
            .published
            .get(&probe.cycle)
            .map_or(false, |max_lead| probe.lead_hours <= *max_lead))
    }

    fn inventory(&self, request: &RetrievalRequest) -> Result<Vec<String>, RetrievalError> {
        if self.empty_inventory || self.response.is_none() {
            return Ok(Vec::new());
        }
        Ok(request
            .objects()
            .enumerate()
            .map(|(i, object)| {
                format!(
                    "{}:0:d={}:{}:{} hour fcst:",
                    i + 1,
                    object.cycle.format("%Y%m%d%H"),
                    request.pattern.trim_matches(':'),
                    object.lead_hours
                )
            })
            .collect())
    }

    fn fetch(&self, request: &RetrievalRequest) -> Result<Retrieved<GridDataset>, RetrievalError> {
        self.requests.borrow_mut().push(request.clone());
        match &self.response {
            None => Err(RetrievalError::NoData(request.to_string())),
            Some(Response::Single(grid)) => Ok(Retrieved::Single(grid.clone())),
            Some(Response::Multiple(grids)) => Ok(Retrieved::Multiple(grids.clone())),
            Some(Response::Generated(variables)) => {
                let names: Vec<&str> = variables.iter().map(String::as_str).collect();
                let grid = match request.cycles.as_slice() {
                    [cycle] => forecast_grid(*cycle, request.lead_times.hours(), &names),
                    cycles => nowcast_grid(cycles, request.lead_times.hours(), &names),
                };
                Ok(Retrieved::Single(grid))
            }
        }
    }
}

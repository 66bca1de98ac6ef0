//! Whole-run correction of an assembly from its error queues.
//!
//! A run proceeds in four phases:
//!
//! 1. cut the document at both boundaries of every error region;
//! 2. search an insertion site for each translocation, which may cut more;
//! 3. on the final cut document, collect the contigs inside each region;
//! 4. apply the moves, then the inversions, then relocate debris.
//!
//! Contig names are collected only in phase 3 because every cut renames the
//! fragments after it.

use crate::assembly::{AssemblyDocument, AssemblyError, InsertSide};
use crate::config::SearchConfig;
use crate::hic::{ContactSource, HicError};
use crate::queue::{
    write_plans, DebrisPlan, ErrorClass, ErrorQueue, InversionPlan, QueueError, TranslocationPlan,
};
use crate::resolver::{
    cut_boundary, select_insert_target, ErrorRegion, InsertionResolver, ResolveError,
};
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Hic(#[from] HicError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Which error classes a run corrects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassFilter {
    pub translocation: bool,
    pub inversion: bool,
    pub debris: bool,
}

impl Default for ClassFilter {
    fn default() -> Self {
        Self {
            translocation: true,
            inversion: true,
            debris: true,
        }
    }
}

impl ClassFilter {
    pub fn allows(&self, class: ErrorClass) -> bool {
        match class {
            ErrorClass::Translocation => self.translocation,
            ErrorClass::Inversion => self.inversion,
            ErrorClass::Debris => self.debris,
        }
    }
}

/// Plans applied by a run, keyed by error id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectifyReport {
    pub translocations: Vec<(String, TranslocationPlan)>,
    pub inversions: Vec<(String, InversionPlan)>,
    pub debris: Vec<(String, DebrisPlan)>,
}

impl RectifyReport {
    /// Write one `<class>_plan.json` per non-empty class into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        if !self.translocations.is_empty() {
            let path = dir.join("translocation_plan.json");
            write_plans(&path, &self.translocations)?;
            written.push(path);
        }
        if !self.inversions.is_empty() {
            let path = dir.join("inversion_plan.json");
            write_plans(&path, &self.inversions)?;
            written.push(path);
        }
        if !self.debris.is_empty() {
            let path = dir.join("debris_plan.json");
            write_plans(&path, &self.debris)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Translocation state carried from the search phase to the plan phase.
struct PendingMove {
    id: String,
    region: ErrorRegion,
    window: Range<u64>,
    side: InsertSide,
}

/// Corrects a document from translocation, inversion and debris queues.
pub struct Rectifier<S> {
    resolver: InsertionResolver<S>,
    classes: ClassFilter,
}

impl<S: ContactSource> Rectifier<S> {
    pub fn new(source: S, ratio: f64) -> Result<Self> {
        Ok(Self {
            resolver: InsertionResolver::new(source, ratio)?,
            classes: ClassFilter::default(),
        })
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.resolver = self.resolver.with_config(config);
        self
    }

    pub fn with_classes(mut self, classes: ClassFilter) -> Self {
        self.classes = classes;
        self
    }

    #[inline]
    pub fn resolver(&self) -> &InsertionResolver<S> {
        &self.resolver
    }

    /// Correct `doc` and return the new document with the applied plans.
    pub fn rectify(
        &self,
        doc: &AssemblyDocument,
        queues: &[ErrorQueue],
    ) -> Result<(AssemblyDocument, RectifyReport)> {
        let ratio = self.resolver.ratio();
        let queues: Vec<&ErrorQueue> = queues
            .iter()
            .filter(|q| self.classes.allows(q.class))
            .collect();

        // Phase 1: error boundaries.
        let mut document = doc.clone();
        for queue in &queues {
            for region in queue.regions() {
                let span = region.to_document(ratio);
                document = cut_boundary(document, span.start)?;
                document = cut_boundary(document, span.end)?;
            }
            info!(class = %queue.class, errors = queue.len(), "cut error boundaries");
        }

        // Phase 2: insertion sites.
        let mut pending = Vec::new();
        for queue in queues
            .iter()
            .filter(|q| q.class == ErrorClass::Translocation)
        {
            for (id, region) in &queue.entries {
                info!(
                    error = %id,
                    start = region.start,
                    end = region.end,
                    "resolving translocation"
                );
                let resolution = self.resolver.resolve(&document, *region)?;
                document = resolution.document;
                pending.push(PendingMove {
                    id: id.clone(),
                    region: *region,
                    window: resolution.insertion.document_window,
                    side: resolution.insertion.side,
                });
            }
        }

        // Phase 3: plans on the final cut document.
        let mut report = RectifyReport::default();
        for moved in &pending {
            let span = moved.region.to_document(ratio);
            let moves_ctg = contig_names(&document, span.start, span.end);
            let Some(anchor) = select_insert_target(&document, moved.window.start, moved.window.end)
            else {
                warn!(error = %moved.id, "insertion window lost its contigs, skipping");
                continue;
            };
            if moves_ctg.is_empty() || moves_ctg.contains(&anchor.name) {
                warn!(
                    error = %moved.id,
                    anchor = %anchor.name,
                    "insertion site lies inside the moved region, skipping"
                );
                continue;
            }
            report.translocations.push((
                moved.id.clone(),
                TranslocationPlan {
                    start: moved.region.start,
                    end: moved.region.end,
                    moves_ctg,
                    insert_site: anchor.name,
                    direction: moved.side,
                },
            ));
        }
        for queue in &queues {
            for (id, region) in &queue.entries {
                let span = region.to_document(ratio);
                let names = contig_names(&document, span.start, span.end);
                match queue.class {
                    ErrorClass::Translocation => {}
                    ErrorClass::Inversion => report.inversions.push((
                        id.clone(),
                        InversionPlan {
                            start: region.start,
                            end: region.end,
                            inv_ctg: names,
                        },
                    )),
                    ErrorClass::Debris => report.debris.push((
                        id.clone(),
                        DebrisPlan {
                            start: region.start,
                            end: region.end,
                            deb_ctg: names,
                        },
                    )),
                }
            }
        }

        // Phase 4: apply.
        for (id, plan) in &report.translocations {
            info!(
                error = %id,
                contigs = plan.moves_ctg.len(),
                anchor = %plan.insert_site,
                side = %plan.direction,
                "moving translocation"
            );
            document = document.move_contigs(&plan.moves_ctg, &plan.insert_site, plan.direction)?;
        }
        for (_, plan) in &report.inversions {
            for name in &plan.inv_ctg {
                document = document.invert(name)?;
            }
        }
        let debris: Vec<&str> = report
            .debris
            .iter()
            .flat_map(|(_, plan)| plan.deb_ctg.iter().map(String::as_str))
            .collect();
        if !debris.is_empty() {
            document = document.relocate_debris_to_tail(&debris)?;
        }

        info!(
            translocations = report.translocations.len(),
            inversions = report.inversions.len(),
            debris = report.debris.len(),
            contigs = document.info().contig_count,
            "rectification done"
        );
        Ok((document, report))
    }

    /// Read the assembly and the queues in `errors_dir`, correct, and write
    /// the corrected assembly to `output` with the plans beside it.
    pub fn run(&self, assembly: &Path, errors_dir: &Path, output: &Path) -> Result<RectifyReport> {
        let doc = AssemblyDocument::from_path(assembly)?;
        let mut queues = Vec::new();
        for class in ErrorClass::ALL {
            if !self.classes.allows(class) {
                continue;
            }
            if let Some(queue) = ErrorQueue::read_dir(errors_dir, class)? {
                queues.push(queue);
            }
        }

        let (corrected, report) = self.rectify(&doc, &queues)?;
        corrected.save(output)?;

        let plan_dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        report.write_to(plan_dir)?;
        info!(output = %output.display(), "wrote corrected assembly");
        Ok(report)
    }
}

fn contig_names(doc: &AssemblyDocument, start: u64, end: u64) -> Vec<String> {
    doc.find_contigs_in_range(start, end)
        .into_iter()
        .map(|location| location.name)
        .collect()
}

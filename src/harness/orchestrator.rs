// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Harness orchestrator - drives every asset through render, round-trip and schema checks

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::time::Instant;

use super::types::{CaseReport, CaseStatus, HarnessReport, RenderCheck, SchemaCheck};
use crate::archive::BaselineArchiver;
use crate::catalog::{Asset, AssetCatalog, FamilyFilter};
use crate::checker::SchemaCheckRunner;
use crate::compare::ImageComparator;
use crate::config::{HarnessConfig, RunMode};
use crate::error::HarnessError;
use crate::pipeline::{ArtifactPaths, ConversionMode, ConversionPipeline, ConversionStatus};
use crate::results::{DiagnosticsDocument, RegressionVerdict, ResultStore};
use crate::tools::{CancelFlag, Toolchain};

type BaselineDocuments = HashMap<String, Option<DiagnosticsDocument>>;

/// Runs the case table in one mode and packages the results
pub struct Harness<'a> {
    config: &'a HarnessConfig,
    toolchain: &'a dyn Toolchain,
    comparator: ImageComparator,
    store: ResultStore,
    cancel: CancelFlag,
}

impl<'a> Harness<'a> {
    /// `cancel` should be the flag the toolchain's runner watches so fail-fast
    /// also stops tool invocations already in flight.
    pub fn new(config: &'a HarnessConfig, toolchain: &'a dyn Toolchain, cancel: CancelFlag) -> Self {
        Self {
            config,
            toolchain,
            comparator: ImageComparator::new(config.similarity_threshold),
            store: ResultStore::new(),
            cancel,
        }
    }

    /// The (family, asset) case table for this configuration
    pub fn cases(&self, filter: &FamilyFilter) -> Vec<Asset> {
        AssetCatalog::discover(self.config, filter)
    }

    /// Execute every case, then finalise the baseline or results tree
    pub fn run(&self, mode: RunMode, filter: &FamilyFilter) -> Result<HarnessReport> {
        let start = Instant::now();
        let cases = self.cases(filter);

        tracing::info!(
            mode = mode.as_str(),
            platform = %self.config.platform,
            cases = cases.len(),
            "starting run"
        );

        self.reset_documents(mode, filter)?;
        let baselines = match mode {
            RunMode::Verify => self.load_baselines(filter),
            RunMode::Generate => HashMap::new(),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parallelism.unwrap_or(0))
            .build()
            .context("Failed to build worker pool")?;

        let pb = if self.config.verbose {
            let p = ProgressBar::new(cases.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            {
                p.set_style(style.progress_chars("#>-"));
            }
            Some(p)
        } else {
            None
        };

        let pipeline = ConversionPipeline::new(self.config, self.toolchain, mode);
        let results: Vec<CaseReport> = pool.install(|| {
            cases
                .par_iter()
                .map(|asset| {
                    let case = self.run_case(&pipeline, asset, mode, &baselines);
                    if let Some(ref p) = pb {
                        p.inc(1);
                    }
                    case
                })
                .collect()
        });

        if let Some(p) = pb {
            p.finish_and_clear();
        }

        let mut report = HarnessReport::new(mode, &self.config.platform);
        for case in results {
            report.add_case(case);
        }

        self.finalize(mode, &report)?;
        report.duration = start.elapsed();

        tracing::info!(
            total = report.total,
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            errors = report.errors,
            cancelled = report.cancelled,
            "run finished"
        );
        Ok(report)
    }

    /// Start each family's results document from scratch
    fn reset_documents(&self, mode: RunMode, filter: &FamilyFilter) -> Result<()> {
        for family in &self.config.families {
            if !family.schema_check || filter.narrow(family).extensions.is_empty() {
                continue;
            }
            let document = self.config.results_document(&family.name, mode);
            self.store
                .reset(&document)
                .with_context(|| format!("Failed to reset {}", document.display()))?;
        }
        Ok(())
    }

    fn load_baselines(&self, filter: &FamilyFilter) -> BaselineDocuments {
        self.config
            .families
            .iter()
            .filter(|f| f.schema_check && !filter.narrow(f).extensions.is_empty())
            .map(|f| {
                let doc = ResultStore::load_baseline(&self.config.baseline_document(&f.name));
                (f.name.clone(), doc)
            })
            .collect()
    }

    fn run_case(
        &self,
        pipeline: &ConversionPipeline<'_>,
        asset: &Asset,
        mode: RunMode,
        baselines: &BaselineDocuments,
    ) -> CaseReport {
        if self.cancel.is_cancelled() {
            return CaseReport::cancelled(asset.clone());
        }

        let span = tracing::info_span!("case", asset = %asset.display_name());
        let _enter = span.enter();
        let start = Instant::now();
        let mut case = CaseReport::new(asset.clone());

        for conversion in ConversionMode::ALL {
            let check = if self.cancel.is_cancelled() {
                RenderCheck::new(conversion, CaseStatus::Cancelled)
            } else {
                self.render_check(pipeline, asset, conversion, mode)
            };
            case.renders.push(check);
        }

        let schema_check = self
            .config
            .family(&asset.family)
            .map(|f| f.schema_check)
            .unwrap_or(false);
        if schema_check {
            case.schema = Some(if self.cancel.is_cancelled() {
                SchemaCheck::failed(CaseStatus::Cancelled, HarnessError::Cancelled.to_string())
            } else {
                let baseline = baselines.get(&asset.family).and_then(Option::as_ref);
                self.schema_check(pipeline, asset, mode, baseline)
            });
        }

        case.settle();
        case.duration = start.elapsed();

        if self.config.fail_fast && matches!(case.status, CaseStatus::Failed | CaseStatus::Error) {
            tracing::warn!("fail-fast: cancelling remaining cases");
            self.cancel.cancel();
        }

        tracing::info!(
            status = case.status.as_str(),
            duration_ms = case.duration.as_millis() as u64,
            "case finished"
        );
        case
    }

    fn render_check(
        &self,
        pipeline: &ConversionPipeline<'_>,
        asset: &Asset,
        conversion: ConversionMode,
        mode: RunMode,
    ) -> RenderCheck {
        let outcome = match pipeline.run(asset, conversion) {
            Ok(ConversionStatus::Rendered(outcome)) => outcome,
            Ok(ConversionStatus::Skipped { reason }) => {
                return RenderCheck::new(conversion, CaseStatus::Skipped).with_message(reason);
            }
            Err(err) => {
                tracing::error!(pass = conversion.as_str(), error = %err, "render pass failed");
                return RenderCheck::new(conversion, CaseStatus::from_error(&err))
                    .with_message(err.to_string());
            }
        };

        let mut check = RenderCheck::new(conversion, CaseStatus::Passed);
        check.image = Some(outcome.rendered_image.clone());
        if mode == RunMode::Generate {
            return check;
        }

        let paths = pipeline.paths(asset);
        let golden = match conversion {
            ConversionMode::Basic => paths.baseline_render,
            ConversionMode::Roundtrip => paths.baseline_roundtrip_render,
        };
        if !golden.exists() {
            let err = HarnessError::BaselineMissing {
                key: golden.display().to_string(),
            };
            tracing::warn!(pass = conversion.as_str(), "{}", err);
            check.status = CaseStatus::Skipped;
            check.message = Some(err.to_string());
            return check;
        }

        let measured = self.comparator.measure(&golden, &outcome.rendered_image);
        match &measured {
            Ok(similarity) => tracing::info!(
                pass = conversion.as_str(),
                similarity,
                threshold = self.comparator.threshold(),
                "image comparison"
            ),
            Err(err) => {
                tracing::error!(pass = conversion.as_str(), error = %err, "images cannot be compared");
                check.message = Some(err.to_string());
            }
        }
        let verdict = self.comparator.verdict(&measured);

        if !verdict.pass() {
            check.status = CaseStatus::Failed;
            if self.config.write_diff_images && verdict.similarity_ratio().is_some() {
                let diff = ArtifactPaths::diff_image_for(&outcome.rendered_image);
                match self
                    .comparator
                    .write_diff_image(&golden, &outcome.rendered_image, &diff)
                {
                    Ok(_) => check.diff_image = Some(diff),
                    Err(err) => tracing::warn!(error = %err, "could not write diff image"),
                }
            }
        }
        check.verdict = Some(verdict);
        check
    }

    fn schema_check(
        &self,
        pipeline: &ConversionPipeline<'_>,
        asset: &Asset,
        mode: RunMode,
        baseline: Option<&DiagnosticsDocument>,
    ) -> SchemaCheck {
        let document = self.config.results_document(&asset.family, mode);
        let checked = pipeline.convert_for_check(asset).and_then(|file| {
            SchemaCheckRunner::new(self.toolchain, &self.store).check(&file, &document)
        });

        let result = match checked {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = %err, "schema check failed");
                return SchemaCheck::failed(CaseStatus::from_error(&err), err.to_string());
            }
        };

        let verdict = match mode {
            RunMode::Generate => None,
            RunMode::Verify => Some(match baseline {
                Some(doc) => ResultStore::compare_to_baseline(&result, doc),
                None => RegressionVerdict::Skip {
                    filename: result.filename.clone(),
                },
            }),
        };

        let status = match verdict {
            None | Some(RegressionVerdict::Pass { .. }) => CaseStatus::Passed,
            Some(RegressionVerdict::Skip { .. }) => CaseStatus::Skipped,
            Some(RegressionVerdict::Fail { .. }) => CaseStatus::Failed,
        };

        SchemaCheck {
            status,
            message: verdict
                .as_ref()
                .filter(|v| v.is_failure())
                .map(|_| "schema validator errors increased over baseline".to_string()),
            result: Some(result),
            verdict,
        }
    }

    fn finalize(&self, mode: RunMode, report: &HarnessReport) -> Result<()> {
        let archiver = BaselineArchiver::new(mode);
        let render_ext = self.config.render_extension.as_str();

        match mode {
            RunMode::Generate => {
                if report.has_failures() {
                    tracing::warn!("baseline generation had failures; packaging what was produced");
                }
                let keep = [render_ext, ".json"];
                let generated = self.config.output_platform_dir(RunMode::Generate);
                let baseline_root = self.config.root.join(&self.config.baseline_dir);

                archiver.prune(&generated, &keep)?;
                archiver.install(&generated, &self.config.baseline_platform_dir(), &[render_ext])?;
                archiver.prune(&baseline_root, &keep)?;
                archiver.archive(
                    &self.config.baseline_platform_dir(),
                    &[render_ext],
                    &self.config.images_archive(),
                )?;
            }
            RunMode::Verify => {
                if report.has_failures() {
                    tracing::info!("run failed; results archive not written");
                } else {
                    archiver.archive(
                        &self.config.output_platform_dir(RunMode::Verify),
                        &[self.config.results_file.as_str()],
                        &self.config.results_archive(),
                    )?;
                }
            }
        }
        Ok(())
    }
}

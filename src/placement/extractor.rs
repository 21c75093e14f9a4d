// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sponsored result detection
//!
//! Result markup drifts between experiments and locales, so no single
//! selector is reliable. Detection runs an ordered list of strategies and
//! merges their hits into one sequence:
//!
//! 1. Structured marker (component-type attribute)
//! 2. Class signature of historical ad slots
//! 3. Result containers carrying a "Sponsored" text label
//!
//! An element found by several strategies keeps the position of the first.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

use super::config::DetectionConfig;
use super::types::PlacementError;

/// A parsed results page, scoped to one job's extraction step
pub struct ParsedPage {
    html: Html,
}

impl ParsedPage {
    /// Parse raw page bytes. Invalid UTF-8 is replaced, never rejected.
    pub fn parse(body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        Self {
            html: Html::parse_document(&text),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }
}

/// One sponsored result element and its 1-based position
#[derive(Debug, Clone, Copy)]
pub struct SponsoredCandidate<'a> {
    pub element: ElementRef<'a>,
    pub position: usize,
    /// Strategy that detected it first
    pub strategy: &'static str,
}

/// A single sponsored detection strategy
pub trait SponsoredDetector: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Elements this strategy considers sponsored, in document order
    fn detect<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>>;
}

pub(crate) fn compile_selector(selector: &str) -> Result<Selector, PlacementError> {
    Selector::parse(selector).map_err(|e| PlacementError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Elements explicitly flagged as sponsored by the page's component-type attribute
pub struct StructuredMarkerDetector {
    selector: Selector,
}

impl StructuredMarkerDetector {
    pub fn new(selector: &str) -> Result<Self, PlacementError> {
        Ok(Self {
            selector: compile_selector(selector)?,
        })
    }
}

impl SponsoredDetector for StructuredMarkerDetector {
    fn name(&self) -> &'static str {
        "structured_marker"
    }

    fn detect<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        html.select(&self.selector).collect()
    }
}

/// Elements carrying the compound class used for ad slots in the results grid
pub struct ClassSignatureDetector {
    selector: Selector,
}

impl ClassSignatureDetector {
    pub fn new(selector: &str) -> Result<Self, PlacementError> {
        Ok(Self {
            selector: compile_selector(selector)?,
        })
    }
}

impl SponsoredDetector for ClassSignatureDetector {
    fn name(&self) -> &'static str {
        "class_signature"
    }

    fn detect<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        html.select(&self.selector).collect()
    }
}

/// Generic result containers with a descendant label containing the sponsored text
pub struct TextLabelDetector {
    container: Selector,
    label: Selector,
    text: String,
}

impl TextLabelDetector {
    pub fn new(container: &str, label: &str, text: &str) -> Result<Self, PlacementError> {
        Ok(Self {
            container: compile_selector(container)?,
            label: compile_selector(label)?,
            text: text.to_string(),
        })
    }

    fn has_label(&self, container: &ElementRef) -> bool {
        container
            .select(&self.label)
            .any(|label| label.text().collect::<String>().contains(&self.text))
    }
}

impl SponsoredDetector for TextLabelDetector {
    fn name(&self) -> &'static str {
        "text_label"
    }

    fn detect<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        html.select(&self.container)
            .filter(|container| self.has_label(container))
            .collect()
    }
}

/// Runs the detection strategies in order and merges their hits
pub struct SponsoredExtractor {
    detectors: Vec<Box<dyn SponsoredDetector>>,
}

impl SponsoredExtractor {
    /// Build the default three-strategy extractor
    pub fn new(config: &DetectionConfig) -> Result<Self, PlacementError> {
        Ok(Self::with_detectors(vec![
            Box::new(StructuredMarkerDetector::new(&config.structured_marker)?),
            Box::new(ClassSignatureDetector::new(&config.class_signature)?),
            Box::new(TextLabelDetector::new(
                &config.result_container,
                &config.label_element,
                &config.sponsored_label,
            )?),
        ]))
    }

    /// Build an extractor from an explicit, ordered strategy list
    pub fn with_detectors(detectors: Vec<Box<dyn SponsoredDetector>>) -> Self {
        Self { detectors }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// De-duplicated, order-preserving sponsored sequence.
    ///
    /// Empty when nothing matched; that is the normal "no sponsored results" case.
    pub fn extract<'a>(&self, page: &'a ParsedPage) -> Vec<SponsoredCandidate<'a>> {
        let mut seen = HashSet::new();
        let mut candidates: Vec<SponsoredCandidate<'a>> = Vec::new();

        for detector in &self.detectors {
            let hits = detector.detect(page.html());
            let before = candidates.len();

            for element in hits {
                if seen.insert(element.id()) {
                    candidates.push(SponsoredCandidate {
                        element,
                        position: candidates.len() + 1,
                        strategy: detector.name(),
                    });
                }
            }

            debug!(
                "Strategy {} contributed {} new sponsored elements",
                detector.name(),
                candidates.len() - before
            );
        }

        candidates
    }
}

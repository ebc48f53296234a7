//! Inter-annotator agreement.
//!
//! For one (layer, feature) every pair of sources gets a contingency table of
//! the categories they chose on shared units, scored by a pluggable
//! [`AgreementMeasure`].

pub mod calculator;
pub mod csv;
pub mod measure;
pub mod model;

pub use calculator::{check_measure_configuration, combine, pairwise_agreement};
pub use csv::{render_agreement_csv, render_score_csv};
pub use measure::{
    interpretation, measure_by_name, AgreementMeasure, CohenKappa, KrippendorffAlphaNominal,
    PercentageAgreement, MEASURE_NAMES,
};
pub use model::{
    AgreementUnit, Category, ContingencyCell, ContingencyTable, FeatureId, PairAgreement,
    PairwiseAgreementResult,
};

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use handlergen::model::{
    load_model, Capability, CandidateDeclaration, HandlerKind, LiteralValue, Parameter,
    ProgramModel, ReturnType, SourceRef, Tag,
};
use std::path::PathBuf;

pub const TOKEN: &str = "CancellationToken";

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> ProgramModel {
    load_model(&fixture_path(name)).unwrap()
}

/// A model with `count` request types, each with a primary and a fallback handler,
/// plus every third candidate carrying a defect
pub fn synthetic_model(count: usize) -> ProgramModel {
    let mut model = ProgramModel::default();
    model.declare_type(TOKEN, &[Capability::CancellationToken]);
    let mut candidates = Vec::with_capacity(count * 2);
    for i in 0..count {
        let request = format!("app::Request{i}");
        model.declare_type(&request, &[Capability::Request]);

        let primary = CandidateDeclaration::new(
            format!("app::Primary{i}"),
            "handle",
            ReturnType::Future {
                output: Some("String".into()),
            },
        )
        .asynchronous()
        .param(Parameter::new("request", &request))
        .param(Parameter::new("cancel", TOKEN))
        .tag(
            Tag::new(HandlerKind::Request)
                .arg("Name", LiteralValue::Str("primary".into()))
                .arg("Priority", LiteralValue::Int(10)),
        )
        .at(SourceRef::new(format!("src/r{i}.rs"), 1, 1));

        let mut fallback = CandidateDeclaration::new(
            format!("app::Fallback{i}"),
            "handle",
            ReturnType::Future {
                output: Some("String".into()),
            },
        )
        .asynchronous()
        .param(Parameter::new("request", &request))
        .tag(Tag::new(HandlerKind::Request).arg("Name", LiteralValue::Str("fallback".into())))
        .at(SourceRef::new(format!("src/r{i}.rs"), 2, 1));
        if i % 3 == 0 {
            // async + unit
            fallback.returns = ReturnType::Unit;
        }

        candidates.push(primary);
        candidates.push(fallback);
    }
    model.candidates = candidates;
    model
}

//! Operation extraction and wrapper description
//!
//! Turns one wrapper class into a [`WrapperInfo`]:
//! - async `send*` methods become send functions, async `get*` methods get
//!   functions; the `provider` parameter is dropped everywhere and `via`
//!   for send functions
//! - static `createFromAddress` is required; static `createFromConfig`
//!   enables deployment when compiled bytecode is available
//! - `<Class>Config` becomes the deploy configuration when it is a record
//! - every declared type the unit references lands in `definedTypes`

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactStore, BuildDirArtifacts};
use crate::config::ProjectLayout;
use crate::parser::ast::{ClassDecl, MethodDecl, MethodKind, Param, ParamPattern, SourceUnit, TypeDecl, TypeExpr};
use crate::parser;
use crate::resolver::TypeResolver;
use crate::schema::{DeployData, Functions, ParamInfo, Parameters, WrapperInfo, WrappersData};
use crate::{Error, Result};

/// Interface a wrapper class must implement
pub const CONTRACT_INTERFACE: &str = "Contract";
pub const CREATE_FROM_ADDRESS: &str = "createFromAddress";
pub const CREATE_FROM_CONFIG: &str = "createFromConfig";
/// The send operation pruned when deployment is unavailable
pub const DEPLOY_OPERATION: &str = "sendDeploy";

const SEND_PREFIX: &str = "send";
const GET_PREFIX: &str = "get";

static WRAPPER_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*\.ts$").unwrap());

// ── Operation extraction ──────────────────────────────────

/// Operations and capability markers found on one class
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedOperations {
    pub send_functions: Functions,
    pub get_functions: Functions,
    pub can_be_created_from_address: bool,
    pub can_be_created_from_config: bool,
}

/// Scan a class for send/get operations and factory markers
///
/// # Errors
/// `ParseError` when a qualifying method has a parameter that is not a
/// plain annotated identifier.
pub fn extract_operations(class: &ClassDecl, resolver: &mut TypeResolver) -> Result<ExtractedOperations> {
    let mut ops = ExtractedOperations::default();
    let class_name = class.name.as_deref().unwrap_or("default");

    for method in &class.methods {
        if method.kind != MethodKind::Method {
            continue;
        }
        let is_get = method.name.starts_with(GET_PREFIX);
        if method.is_async && (is_get || method.name.starts_with(SEND_PREFIX)) {
            let params = extract_params(class_name, method, is_get, resolver)?;
            debug!(class = class_name, operation = %method.name, params = params.len(), "extracted operation");
            if is_get {
                ops.get_functions.insert(method.name.clone(), params);
            } else {
                ops.send_functions.insert(method.name.clone(), params);
            }
        } else if method.is_static {
            match method.name.as_str() {
                CREATE_FROM_ADDRESS => ops.can_be_created_from_address = true,
                CREATE_FROM_CONFIG => ops.can_be_created_from_config = true,
                _ => {}
            }
        }
    }

    Ok(ops)
}

fn extract_params(
    class_name: &str,
    method: &MethodDecl,
    is_get: bool,
    resolver: &mut TypeResolver,
) -> Result<Parameters> {
    let mut params = Parameters::new();

    for param in &method.params {
        let (name, optional, annotation) = match &param.pattern {
            ParamPattern::Identifier {
                name,
                optional,
                annotation: Some(annotation),
            } => (name, *optional, annotation),
            _ => {
                return Err(Error::ParseError(format!(
                    "Unexpected param type '{}' in {}.{} at {}",
                    param, class_name, method.name, param.span
                )));
            }
        };

        // invocation context is injected by the caller
        if name == "provider" || (!is_get && name == "via") {
            continue;
        }

        let mut info = ParamInfo::new(resolver.classify(annotation)).optional(optional);
        info.default_value = param.default.clone();
        params.insert(name.clone(), info);
    }

    Ok(params)
}

// ── Wrapper description ───────────────────────────────────

/// Find the class `class_name` implementing exactly `Contract`
fn contract_class<'u>(unit: &'u SourceUnit, class_name: &str, path: &str) -> Result<&'u ClassDecl> {
    let class = unit.class(class_name).ok_or_else(|| Error::ClassNotFound {
        module: path.to_string(),
        class: class_name.to_string(),
    })?;
    let implements_contract = class.implements.len() == 1
        && class.implements[0].bare_reference() == Some(CONTRACT_INTERFACE);
    if !implements_contract {
        return Err(Error::CapabilityError(format!(
            "{} must implement {} (and nothing else)",
            class_name, CONTRACT_INTERFACE
        )));
    }
    Ok(class)
}

/// Resolve the declared types the unit references, in source order.
/// Class members and top-level function signatures count as references.
fn note_defined_types(unit: &SourceUnit, resolver: &mut TypeResolver) {
    enum Item<'u> {
        Decl(&'u TypeDecl),
        Signature(&'u [Param], Option<&'u TypeExpr>),
        Property(&'u TypeExpr),
    }

    let mut items: Vec<(usize, Item)> = unit
        .type_decls
        .iter()
        .map(|decl| (decl.span.offset, Item::Decl(decl)))
        .collect();
    for function in &unit.functions {
        items.push((function.span.offset, Item::Signature(&function.params, function.returns.as_ref())));
    }
    for class in &unit.classes {
        for method in &class.methods {
            items.push((method.span.offset, Item::Signature(&method.params, method.returns.as_ref())));
        }
        for property in &class.properties {
            if let Some(annotation) = &property.annotation {
                items.push((property.span.offset, Item::Property(annotation)));
            }
        }
    }
    items.sort_by_key(|(offset, _)| *offset);

    for (_, item) in items {
        match item {
            Item::Decl(decl) => resolver.note_declaration(decl),
            Item::Signature(params, returns) => {
                for annotation in params.iter().filter_map(|p| p.annotation()) {
                    resolver.note_references(annotation);
                }
                if let Some(returns) = returns {
                    resolver.note_references(returns);
                }
            }
            Item::Property(annotation) => resolver.note_references(annotation),
        }
    }
}

/// Build the description of `class_name` from an already parsed unit.
/// `path` is the display path recorded in the result.
pub fn describe_unit(
    unit: &SourceUnit,
    class_name: &str,
    path: &str,
    artifacts: &dyn ArtifactStore,
) -> Result<WrapperInfo> {
    let class = contract_class(unit, class_name, path)?;
    let mut resolver = TypeResolver::new(unit);

    note_defined_types(unit, &mut resolver);
    let mut ops = extract_operations(class, &mut resolver)?;

    if !ops.can_be_created_from_address {
        return Err(Error::CapabilityError(format!(
            "{} cannot be created from address (static {} is required)",
            class_name, CREATE_FROM_ADDRESS
        )));
    }

    let config_type = resolver.resolve_record(&format!("{}Config", class_name));

    let mut code_hex = None;
    if ops.can_be_created_from_config {
        match artifacts.code_hex(class_name) {
            Ok(hex) => code_hex = Some(hex),
            Err(e) => {
                warn!(class = class_name, error = %e, "no compiled artifact, deployment disabled");
                ops.can_be_created_from_config = false;
                ops.send_functions.shift_remove(DEPLOY_OPERATION);
            }
        }
    }

    Ok(WrapperInfo {
        send_functions: ops.send_functions,
        get_functions: ops.get_functions,
        path: path.to_string(),
        deploy: DeployData {
            can_be_created_from_config: ops.can_be_created_from_config,
            config_type,
            code_hex,
        },
        defined_types: Some(resolver.defined_types()),
    })
}

/// Read a wrapper file, following one `export * from` hop
pub fn load_wrapper_source(file: &Path) -> Result<SourceUnit> {
    let text = fs::read_to_string(file).map_err(|e| Error::io(file, e))?;
    let unit = parser::parse(&text)?;

    let Some(target) = unit.reexports.first() else {
        return Ok(unit);
    };
    let dir = file.parent().unwrap_or_else(|| Path::new("."));
    let mut reexported = dir.join(target);
    if reexported.extension().map_or(true, |ext| ext != "ts") {
        reexported = dir.join(format!("{}.ts", target));
    }
    debug!(from = %file.display(), to = %reexported.display(), "following re-export");

    let text = fs::read_to_string(&reexported).map_err(|e| Error::io(&reexported, e))?;
    parser::parse(&text)
}

/// Describe the wrapper class `class_name` declared in `file`
pub fn build_wrapper(
    file: &Path,
    class_name: &str,
    artifacts: &dyn ArtifactStore,
    layout: &ProjectLayout,
) -> Result<WrapperInfo> {
    let unit = load_wrapper_source(file)?;
    let info = describe_unit(&unit, class_name, &layout.display_path(file), artifacts)?;
    info!(
        class = class_name,
        send = info.send_functions.len(),
        get = info.get_functions.len(),
        deployable = info.deploy.can_be_created_from_config,
        "described wrapper"
    );
    Ok(info)
}

// ── Batch extraction ──────────────────────────────────────

/// Wrapper files in `dir` (capitalized `*.ts` names), sorted
pub fn discover_wrappers(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let name = entry.file_name();
        if WRAPPER_FILE.is_match(&name.to_string_lossy()) && entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Clone)]
pub struct ExtractionFailure {
    pub class: String,
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub wrappers: WrappersData,
    pub failures: Vec<ExtractionFailure>,
}

impl ExtractionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Describe every wrapper of a project. A wrapper that fails is reported
/// and skipped; the rest still succeed.
pub fn extract_project(layout: &ProjectLayout) -> Result<ExtractionReport> {
    let artifacts = BuildDirArtifacts::new(&layout.build_dir);
    let mut report = ExtractionReport::default();

    for file in discover_wrappers(&layout.wrappers_dir)? {
        let class = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match build_wrapper(&file, &class, &artifacts, layout) {
            Ok(info) => {
                report.wrappers.insert(class, info);
            }
            Err(error) => {
                warn!(class = %class, error = %error, "wrapper skipped");
                report.failures.push(ExtractionFailure {
                    class,
                    path: file,
                    error,
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DefinedType, ParamType, UnionMember};
    use std::collections::HashMap;

    struct MapArtifacts(HashMap<String, String>);

    impl ArtifactStore for MapArtifacts {
        fn code_hex(&self, class_name: &str) -> Result<String> {
            self.0
                .get(class_name)
                .cloned()
                .ok_or_else(|| Error::ArtifactError(class_name.to_string()))
        }
    }

    fn no_artifacts() -> MapArtifacts {
        MapArtifacts(HashMap::new())
    }

    fn with_artifact(name: &str) -> MapArtifacts {
        MapArtifacts(HashMap::from([(name.to_string(), "b5ee9c72".to_string())]))
    }

    const COUNTER: &str = r#"
import { Address, Cell, Contract, ContractProvider, Sender } from '@ton/core';

export type CounterConfig = {
    id: number;
    counter: number;
};

export type Mode = Fixed | string;
type Fixed = { amount: bigint };

export class Counter implements Contract {
    constructor(readonly address: Address, readonly init?: { code: Cell; data: Cell }) {}

    static createFromAddress(address: Address) {
        return new Counter(address);
    }

    static createFromConfig(config: CounterConfig, code: Cell, workchain = 0) {
        return new Counter(address);
    }

    async sendDeploy(provider: ContractProvider, via: Sender, value: bigint) {}

    async sendIncrease(provider: ContractProvider, via: Sender, opts: { increaseBy: number; queryID?: number }, mode: Mode) {}

    async getCounter(provider: ContractProvider) {
        return 0;
    }

    async getBalanceOf(provider: ContractProvider, via: Address, owner?: Address, limit: number = 10) {}

    sendSync(provider: ContractProvider, via: Sender, value: bigint) {}

    get total() { return 1; }
}
"#;

    fn describe(source: &str, class: &str, artifacts: &MapArtifacts) -> Result<WrapperInfo> {
        let unit = parser::parse(source).unwrap();
        describe_unit(&unit, class, "./wrappers/Test.ts", artifacts)
    }

    #[test]
    fn test_send_and_get_functions() {
        let info = describe(COUNTER, "Counter", &with_artifact("Counter")).unwrap();
        let send: Vec<&String> = info.send_functions.keys().collect();
        let get: Vec<&String> = info.get_functions.keys().collect();
        assert_eq!(send, vec!["sendDeploy", "sendIncrease"]);
        assert_eq!(get, vec!["getCounter", "getBalanceOf"]);

        assert_eq!(info.send_functions["sendDeploy"].keys().collect::<Vec<_>>(), vec!["value"]);
        assert!(info.get_functions["getCounter"].is_empty());
    }

    #[test]
    fn test_via_kept_for_get_functions() {
        let info = describe(COUNTER, "Counter", &with_artifact("Counter")).unwrap();
        let params = &info.get_functions["getBalanceOf"];
        let keys: Vec<&String> = params.keys().collect();
        assert_eq!(keys, vec!["via", "owner", "limit"]);
        assert!(params["owner"].optional);
        assert_eq!(params["limit"].default_value.as_deref(), Some("10"));
        assert_eq!(params["limit"].ty, ParamType::Primitive("number".into()));
    }

    #[test]
    fn test_nested_and_union_params() {
        let info = describe(COUNTER, "Counter", &with_artifact("Counter")).unwrap();
        let params = &info.send_functions["sendIncrease"];
        match &params["opts"].ty {
            ParamType::Nested(fields) => {
                assert!(fields["queryID"].optional);
                assert_eq!(fields["increaseBy"].ty, ParamType::Primitive("number".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &params["mode"].ty {
            ParamType::Union(members) => {
                assert!(matches!(&members[0], UnionMember::Record(f) if f.contains_key("amount")));
                assert_eq!(members[1], UnionMember::Primitive("string".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_deploy_with_artifact() {
        let info = describe(COUNTER, "Counter", &with_artifact("Counter")).unwrap();
        assert!(info.deploy.can_be_created_from_config);
        assert_eq!(info.deploy.code_hex.as_deref(), Some("b5ee9c72"));
        let config = info.deploy.config_type.as_ref().unwrap();
        assert_eq!(config.keys().collect::<Vec<_>>(), vec!["id", "counter"]);
    }

    #[test]
    fn test_missing_artifact_disables_deploy() {
        let info = describe(COUNTER, "Counter", &no_artifacts()).unwrap();
        assert!(!info.deploy.can_be_created_from_config);
        assert_eq!(info.deploy.code_hex, None);
        assert!(!info.send_functions.contains_key("sendDeploy"));
        assert!(info.send_functions.contains_key("sendIncrease"));
    }

    #[test]
    fn test_without_create_from_config() {
        let source = "class A implements Contract {\n  static createFromAddress(a: Address) {}\n  async sendDeploy(provider: ContractProvider, via: Sender) {}\n}";
        let info = describe(source, "A", &with_artifact("A")).unwrap();
        assert!(!info.deploy.can_be_created_from_config);
        assert_eq!(info.deploy.code_hex, None);
        assert!(info.send_functions.contains_key("sendDeploy"));
    }

    #[test]
    fn test_missing_create_from_address_fails() {
        let source = "class A implements Contract {\n  static createFromConfig(c: AConfig, code: Cell) {}\n}";
        match describe(source, "A", &with_artifact("A")) {
            Err(Error::CapabilityError(msg)) => assert!(msg.contains("createFromAddress"), "{}", msg),
            other => panic!("expected CapabilityError, got {:?}", other),
        }
    }

    #[test]
    fn test_contract_interface_required() {
        let plain = "class A {\n  static createFromAddress(a: Address) {}\n}";
        assert!(matches!(describe(plain, "A", &no_artifacts()), Err(Error::CapabilityError(_))));

        let extra = "class A implements Contract, Other {\n  static createFromAddress(a: Address) {}\n}";
        assert!(matches!(describe(extra, "A", &no_artifacts()), Err(Error::CapabilityError(_))));

        assert!(matches!(describe(plain, "B", &no_artifacts()), Err(Error::ClassNotFound { .. })));
    }

    #[test]
    fn test_destructured_param_is_parse_error() {
        let source = "class A implements Contract {\n  static createFromAddress(a: Address) {}\n  async sendX(provider: ContractProvider, { a, b }: Opts) {}\n}";
        match describe(source, "A", &no_artifacts()) {
            Err(Error::ParseError(msg)) => assert!(msg.contains("A.sendX"), "{}", msg),
            other => panic!("expected ParseError, got {:?}", other),
        }

        let untyped = "class A implements Contract {\n  static createFromAddress(a: Address) {}\n  async getX(provider) {}\n}";
        assert!(matches!(describe(untyped, "A", &no_artifacts()), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_config_alias_is_not_config_type() {
        let source = "type AConfig = Cell;\nclass A implements Contract {\n  static createFromAddress(a: Address) {}\n  static createFromConfig(c: AConfig, code: Cell) {}\n}";
        let info = describe(source, "A", &with_artifact("A")).unwrap();
        assert_eq!(info.deploy.config_type, None);
        assert!(info.deploy.can_be_created_from_config);
        let types = info.defined_types.unwrap();
        assert_eq!(types["AConfig"], DefinedType::Alias("Cell".into()));
    }

    #[test]
    fn test_defined_types_in_reference_order() {
        let info = describe(COUNTER, "Counter", &with_artifact("Counter")).unwrap();
        let types = info.defined_types.unwrap();
        let names: Vec<&String> = types.keys().collect();
        assert_eq!(names, vec!["Fixed", "CounterConfig", "Mode"]);
        assert_eq!(types["Mode"], DefinedType::Alias("Fixed | string".into()));
    }

    #[test]
    fn test_defined_types_from_functions_and_properties() {
        let source = r#"
type FooData = { x: number };
type PropData = { flag: boolean };
type Unused = { y: number };

export function fooToCell(c: FooData): Cell {
    return beginCell().endCell();
}

export class A implements Contract {
    opts: PropData = { flag: true };
    static createFromAddress(a: Address) {}
}
"#;
        let info = describe(source, "A", &no_artifacts()).unwrap();
        let types = info.defined_types.unwrap();
        let names: Vec<&String> = types.keys().collect();
        assert_eq!(names, vec!["FooData", "PropData"]);
        assert!(types["PropData"].as_record().unwrap().contains_key("flag"));
    }

    #[test]
    fn test_recursive_union_alias_describes() {
        let source = r#"
type List = { head: number; tail: List } | null;

export class L implements Contract {
    static createFromAddress(a: Address) {}
    async sendPush(provider: ContractProvider, via: Sender, l: List) {}
}
"#;
        let info = describe(source, "L", &no_artifacts()).unwrap();
        assert_eq!(info.send_functions["sendPush"]["l"].type_tag(), "union");
        assert!(info.defined_types.unwrap().contains_key("List"));
    }

    #[test]
    fn test_reexport_is_followed() {
        let dir = tempfile::tempdir().unwrap();
        let wrappers = dir.path().join("wrappers");
        let build = dir.path().join("build").join("Token");
        fs::create_dir_all(&wrappers).unwrap();
        fs::create_dir_all(&build).unwrap();
        fs::write(wrappers.join("Token.ts"), "export * from '../build/Token/tact_Token';\n").unwrap();
        fs::write(
            build.join("tact_Token.ts"),
            "export class Token implements Contract {\n  static async createFromAddress(address: Address) {}\n  async getSupply(provider: ContractProvider) {}\n}",
        )
        .unwrap();

        let layout = ProjectLayout::new(dir.path());
        let info = build_wrapper(&wrappers.join("Token.ts"), "Token", &no_artifacts(), &layout).unwrap();
        assert_eq!(info.path, "./wrappers/Token.ts");
        assert!(info.get_functions.contains_key("getSupply"));
    }

    #[test]
    fn test_extract_project_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        fs::create_dir_all(&layout.wrappers_dir).unwrap();
        fs::create_dir_all(&layout.build_dir).unwrap();
        fs::write(layout.wrappers_dir.join("Counter.ts"), COUNTER).unwrap();
        fs::write(
            layout.wrappers_dir.join("Broken.ts"),
            "class Broken implements Contract {\n  async sendX(provider: ContractProvider) {}\n}",
        )
        .unwrap();
        fs::write(layout.wrappers_dir.join("helpers.ts"), "export const x = 1;").unwrap();
        fs::write(layout.build_dir.join("Counter.compiled.json"), r#"{"hex": "00ff"}"#).unwrap();

        let report = extract_project(&layout).unwrap();
        assert_eq!(report.wrappers.keys().collect::<Vec<_>>(), vec!["Counter"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].class, "Broken");
        assert!(!report.is_complete());
        assert_eq!(report.wrappers["Counter"].deploy.code_hex.as_deref(), Some("00ff"));
    }

    #[test]
    fn test_discover_wrappers_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Zeta.ts", "Alpha.ts", "lower.ts", "Bad-Name.ts", "Alpha.spec.ts", "Beta.tsx"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let files = discover_wrappers(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Alpha.ts", "Zeta.ts"]);
    }

    #[test]
    fn test_describe_determinism_100_iterations() {
        let first = describe(COUNTER, "Counter", &with_artifact("Counter")).unwrap();
        for i in 0..100 {
            let again = describe(COUNTER, "Counter", &with_artifact("Counter")).unwrap();
            assert_eq!(first, again, "Determinism failure at iteration {}", i);
        }
    }
}

//! Dynamic invocation bridge
//!
//! Turns a filled, schema-shaped argument map into a positional argument
//! list and calls an operation on a live contract instance obtained
//! through a [`ModuleLoader`]. The bridge only sees the loader traits;
//! how a module is actually materialized is up to the embedder.
//!
//! # Argument reconstruction
//!
//! Entries are taken in map order. A `nested` entry holds
//! `{ field: { value } }` and is unwrapped one level into `{ field: value }`,
//! as is a `union` entry whose value is such an object. Every other value
//! passes through unchanged. Deeper values are expected to be plain already.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::schema::{Parameters, WrapperInfo, NESTED_TAG, UNION_TAG};
use crate::{Error, Result};

/// Operation invoked by a deploy call
pub const DEPLOY_OPERATION: &str = crate::extractor::DEPLOY_OPERATION;

// ── Values ────────────────────────────────────────────────

/// Contract address, opaque to the bridge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

/// One filled argument: the schema descriptor plus its value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentValue {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub value: Value,
}

impl ArgumentValue {
    pub fn new(ty: impl Into<String>, value: Value) -> Self {
        ArgumentValue {
            ty: ty.into(),
            optional: false,
            value,
        }
    }
}

/// Filled argument map, in positional order
pub type ArgumentMap = IndexMap<String, ArgumentValue>;

// ── Loader capabilities ───────────────────────────────────

/// Signing context for mutating and deploy calls
pub trait Sender: Send + Sync {
    fn address(&self) -> Option<Address>;
}

pub trait ContractInstance: Send + Sync {
    fn address(&self) -> Address;

    fn has_operation(&self, operation: &str) -> bool;

    /// Call `operation`; `via` is present for send and deploy calls
    fn invoke(&self, operation: &str, via: Option<&dyn Sender>, args: &[Value]) -> Result<Value>;
}

pub trait ContractClass: Send + Sync {
    fn create_from_address(&self, address: &Address) -> Result<Arc<dyn ContractInstance>>;

    fn create_from_config(&self, config: &Value, code: &[u8]) -> Result<Arc<dyn ContractInstance>>;
}

pub trait WrapperModule: Send + Sync {
    fn class(&self, name: &str) -> Option<Arc<dyn ContractClass>>;
}

pub trait ModuleLoader: Send + Sync {
    /// Load the module at `path`; `ModuleNotFound` when it cannot be loaded
    fn load(&self, path: &str) -> Result<Arc<dyn WrapperModule>>;
}

/// Module lookup key: wrapper paths are accepted with or without `.ts`
pub fn module_key(path: &str) -> &str {
    path.strip_suffix(".ts").unwrap_or(path)
}

// ── In-memory registry ────────────────────────────────────

type AddressFactory = Box<dyn Fn(&Address) -> Result<Arc<dyn ContractInstance>> + Send + Sync>;
type ConfigFactory = Box<dyn Fn(&Value, &[u8]) -> Result<Arc<dyn ContractInstance>> + Send + Sync>;

/// A contract class assembled from factory closures
pub struct ClassDef {
    name: String,
    from_address: AddressFactory,
    from_config: Option<ConfigFactory>,
}

impl ClassDef {
    pub fn new(
        name: impl Into<String>,
        from_address: impl Fn(&Address) -> Result<Arc<dyn ContractInstance>> + Send + Sync + 'static,
    ) -> Self {
        ClassDef {
            name: name.into(),
            from_address: Box::new(from_address),
            from_config: None,
        }
    }

    pub fn with_config_factory(
        mut self,
        from_config: impl Fn(&Value, &[u8]) -> Result<Arc<dyn ContractInstance>> + Send + Sync + 'static,
    ) -> Self {
        self.from_config = Some(Box::new(from_config));
        self
    }
}

impl ContractClass for ClassDef {
    fn create_from_address(&self, address: &Address) -> Result<Arc<dyn ContractInstance>> {
        (self.from_address)(address)
    }

    fn create_from_config(&self, config: &Value, code: &[u8]) -> Result<Arc<dyn ContractInstance>> {
        match &self.from_config {
            Some(factory) => factory(config, code),
            None => Err(Error::InvocationError(format!(
                "{} cannot be created from config",
                self.name
            ))),
        }
    }
}

/// A module holding named classes
#[derive(Default)]
pub struct ModuleDef {
    classes: IndexMap<String, Arc<dyn ContractClass>>,
}

impl ModuleDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, name: impl Into<String>, class: Arc<dyn ContractClass>) -> Self {
        self.classes.insert(name.into(), class);
        self
    }
}

impl WrapperModule for ModuleDef {
    fn class(&self, name: &str) -> Option<Arc<dyn ContractClass>> {
        self.classes.get(name).cloned()
    }
}

/// In-memory loader keyed by module path
#[derive(Default)]
pub struct Registry {
    modules: IndexMap<String, Arc<dyn WrapperModule>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: &str, module: Arc<dyn WrapperModule>) {
        self.modules.insert(module_key(path).to_string(), module);
    }
}

impl ModuleLoader for Registry {
    fn load(&self, path: &str) -> Result<Arc<dyn WrapperModule>> {
        self.modules
            .get(module_key(path))
            .cloned()
            .ok_or_else(|| Error::ModuleNotFound(path.to_string()))
    }
}

// ── Argument reconstruction ───────────────────────────────

/// Whether an entry of this type and value is a record to unwrap
fn is_record_entry(arg: &ArgumentValue) -> bool {
    arg.ty == NESTED_TAG || (arg.ty == UNION_TAG && arg.value.is_object())
}

fn reconstruct_one(name: &str, arg: &ArgumentValue) -> Result<Value> {
    if !is_record_entry(arg) {
        return Ok(arg.value.clone());
    }

    let Value::Object(fields) = &arg.value else {
        return Err(Error::MalformedArguments(format!(
            "'{}' of type {} expects an object of fields",
            name, arg.ty
        )));
    };
    let mut record = Map::new();
    for (field, entry) in fields {
        let Value::Object(entry) = entry else {
            return Err(Error::MalformedArguments(format!(
                "field '{}.{}' must be an object with a 'value'",
                name, field
            )));
        };
        record.insert(field.clone(), entry.get("value").cloned().unwrap_or(Value::Null));
    }
    Ok(Value::Object(record))
}

/// Positional argument list for a filled argument map
pub fn reconstruct_args(args: &ArgumentMap) -> Result<Vec<Value>> {
    args.iter().map(|(name, arg)| reconstruct_one(name, arg)).collect()
}

/// Check that `args` has exactly the keys of `params`, with matching types
pub fn check_arguments(params: &Parameters, args: &ArgumentMap) -> Result<()> {
    if let Some(missing) = params.keys().find(|k| !args.contains_key(*k)) {
        return Err(Error::MalformedArguments(format!("missing argument '{}'", missing)));
    }
    if let Some(extra) = args.keys().find(|k| !params.contains_key(*k)) {
        return Err(Error::MalformedArguments(format!("unexpected argument '{}'", extra)));
    }
    for (name, info) in params {
        let declared = &args[name].ty;
        if declared != info.type_tag() {
            return Err(Error::MalformedArguments(format!(
                "argument '{}' declared as {}, schema has {}",
                name,
                declared,
                info.type_tag()
            )));
        }
    }
    Ok(())
}

// ── Bridge ────────────────────────────────────────────────

pub struct Bridge {
    loader: Arc<dyn ModuleLoader>,
    sender: Option<Arc<dyn Sender>>,
}

impl Bridge {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Bridge { loader, sender: None }
    }

    pub fn with_sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.sender = Some(sender);
        self
    }

    fn sender(&self) -> Result<&dyn Sender> {
        self.sender.as_deref().ok_or(Error::NoSender)
    }

    fn class(&self, module_path: &str, class_name: &str) -> Result<Arc<dyn ContractClass>> {
        let module = self.loader.load(module_path)?;
        module.class(class_name).ok_or_else(|| Error::ClassNotFound {
            module: module_path.to_string(),
            class: class_name.to_string(),
        })
    }

    fn instance_at(
        &self,
        address: &Address,
        module_path: &str,
        class_name: &str,
        operation: &str,
    ) -> Result<Arc<dyn ContractInstance>> {
        let instance = self.class(module_path, class_name)?.create_from_address(address)?;
        if !instance.has_operation(operation) {
            return Err(Error::OperationNotFound {
                class: class_name.to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(instance)
    }

    /// Read-only call on the instance at `address`
    pub fn get(
        &self,
        address: &Address,
        module_path: &str,
        class_name: &str,
        operation: &str,
        args: &ArgumentMap,
    ) -> Result<Value> {
        let values = reconstruct_args(args)?;
        let instance = self.instance_at(address, module_path, class_name, operation)?;
        debug!(class = class_name, operation, args = values.len(), "invoking get operation");
        instance.invoke(operation, None, &values)
    }

    /// Mutating call on the instance at `address`, signed by the sender
    pub fn send(
        &self,
        address: &Address,
        module_path: &str,
        class_name: &str,
        operation: &str,
        args: &ArgumentMap,
    ) -> Result<Value> {
        let sender = self.sender()?;
        let values = reconstruct_args(args)?;
        let instance = self.instance_at(address, module_path, class_name, operation)?;
        debug!(class = class_name, operation, args = values.len(), "invoking send operation");
        instance.invoke(operation, Some(sender), &values)
    }

    /// Create an instance from configuration and bytecode, call its deploy
    /// operation with the remaining arguments and return its address.
    ///
    /// Every field of `config_type` is taken out of `args` to build the
    /// configuration record.
    pub fn deploy(
        &self,
        module_path: &str,
        class_name: &str,
        args: &ArgumentMap,
        config_type: &Parameters,
        code_hex: &str,
    ) -> Result<Address> {
        let sender = self.sender()?;

        let mut remaining = args.clone();
        let mut config = Map::new();
        for field in config_type.keys() {
            let arg = remaining
                .shift_remove(field)
                .ok_or_else(|| Error::MalformedArguments(format!("missing config field '{}'", field)))?;
            config.insert(field.clone(), reconstruct_one(field, &arg)?);
        }
        let values = reconstruct_args(&remaining)?;
        let code = hex::decode(code_hex).map_err(|e| Error::InvalidBytecode(e.to_string()))?;

        let instance = self
            .class(module_path, class_name)?
            .create_from_config(&Value::Object(config), &code)?;
        if !instance.has_operation(DEPLOY_OPERATION) {
            return Err(Error::OperationNotFound {
                class: class_name.to_string(),
                operation: DEPLOY_OPERATION.to_string(),
            });
        }
        instance.invoke(DEPLOY_OPERATION, Some(sender), &values)?;

        let address = instance.address();
        info!(class = class_name, address = %address, "deployed");
        Ok(address)
    }

    // ── Schema-checked entry points ───────────────────────

    /// [`Bridge::get`] after checking `args` against the wrapper schema
    pub fn checked_get(
        &self,
        wrapper: &WrapperInfo,
        class_name: &str,
        operation: &str,
        address: &Address,
        args: &ArgumentMap,
    ) -> Result<Value> {
        let params = wrapper.get_functions.get(operation).ok_or_else(|| Error::OperationNotFound {
            class: class_name.to_string(),
            operation: operation.to_string(),
        })?;
        check_arguments(params, args)?;
        self.get(address, &wrapper.path, class_name, operation, args)
    }

    /// [`Bridge::send`] after checking `args` against the wrapper schema
    pub fn checked_send(
        &self,
        wrapper: &WrapperInfo,
        class_name: &str,
        operation: &str,
        address: &Address,
        args: &ArgumentMap,
    ) -> Result<Value> {
        self.sender()?;
        let params = wrapper.send_functions.get(operation).ok_or_else(|| Error::OperationNotFound {
            class: class_name.to_string(),
            operation: operation.to_string(),
        })?;
        check_arguments(params, args)?;
        self.send(address, &wrapper.path, class_name, operation, args)
    }

    /// [`Bridge::deploy`] using the wrapper's deploy descriptor; `args`
    /// must hold the config fields followed by the deploy parameters.
    pub fn checked_deploy(&self, wrapper: &WrapperInfo, class_name: &str, args: &ArgumentMap) -> Result<Address> {
        self.sender()?;
        let not_deployable = || Error::CapabilityError(format!("{} is not deployable", class_name));
        let code_hex = wrapper.deploy.code_hex.as_deref().ok_or_else(not_deployable)?;
        let deploy_params = wrapper.send_functions.get(DEPLOY_OPERATION).ok_or_else(not_deployable)?;
        let config_type = wrapper.deploy.config_type.clone().unwrap_or_default();

        let mut expected = config_type.clone();
        expected.extend(deploy_params.iter().map(|(k, v)| (k.clone(), v.clone())));
        check_arguments(&expected, args)?;

        self.deploy(&wrapper.path, class_name, args, &config_type, code_hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DeployData, ParamInfo};
    use serde_json::json;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(String, bool, Vec<Value>)>>>;

    struct RecordingInstance {
        address: Address,
        operations: Vec<&'static str>,
        calls: Calls,
    }

    impl ContractInstance for RecordingInstance {
        fn address(&self) -> Address {
            self.address.clone()
        }

        fn has_operation(&self, operation: &str) -> bool {
            self.operations.iter().any(|op| *op == operation)
        }

        fn invoke(&self, operation: &str, via: Option<&dyn Sender>, args: &[Value]) -> Result<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((operation.to_string(), via.is_some(), args.to_vec()));
            if operation == "sendFail" {
                return Err(Error::InvocationError("exit code 37".into()));
            }
            Ok(json!(42))
        }
    }

    struct TestSender;

    impl Sender for TestSender {
        fn address(&self) -> Option<Address> {
            Some(Address::from("EQsender"))
        }
    }

    struct Fixture {
        loader: Arc<Registry>,
        calls: Calls,
        deployed: Arc<Mutex<Option<(Value, Vec<u8>)>>>,
    }

    fn fixture() -> Fixture {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let deployed = Arc::new(Mutex::new(None));
        let operations = vec!["getCounter", "sendIncrease", "sendFail", "sendDeploy"];

        let by_address = {
            let calls = calls.clone();
            let operations = operations.clone();
            move |address: &Address| -> Result<Arc<dyn ContractInstance>> {
                Ok(Arc::new(RecordingInstance {
                    address: address.clone(),
                    operations: operations.clone(),
                    calls: calls.clone(),
                }))
            }
        };
        let by_config = {
            let calls = calls.clone();
            let deployed = deployed.clone();
            move |config: &Value, code: &[u8]| -> Result<Arc<dyn ContractInstance>> {
                *deployed.lock().unwrap() = Some((config.clone(), code.to_vec()));
                Ok(Arc::new(RecordingInstance {
                    address: Address::from("EQnew"),
                    operations: operations.clone(),
                    calls: calls.clone(),
                }))
            }
        };

        let class = ClassDef::new("Counter", by_address).with_config_factory(by_config);
        let module = ModuleDef::new().with_class("Counter", Arc::new(class));
        let mut registry = Registry::new();
        registry.register("./wrappers/Counter.ts", Arc::new(module));

        Fixture {
            loader: Arc::new(registry),
            calls,
            deployed,
        }
    }

    fn arg(ty: &str, value: Value) -> ArgumentValue {
        ArgumentValue::new(ty, value)
    }

    fn sample_args() -> ArgumentMap {
        [
            ("amount".to_string(), arg("bigint", json!("10"))),
            ("cfg".to_string(), arg("nested", json!({"x": {"type": "number", "value": 5}}))),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_reconstruct_unwraps_one_level() {
        let values = reconstruct_args(&sample_args()).unwrap();
        assert_eq!(values, vec![json!("10"), json!({"x": 5})]);
    }

    #[test]
    fn test_reconstruct_passthrough_and_edge_cases() {
        let args: ArgumentMap = [
            ("to".to_string(), arg("Address", json!("EQabc"))),
            ("list".to_string(), arg("Array<bigint>", json!(["1", "2"]))),
            ("cells".to_string(), arg("Cell[]", json!([]))),
            ("choice".to_string(), arg("union", json!("plain"))),
            ("opts".to_string(), arg("nested", json!({"a": {"value": 1}, "b": {}}))),
        ]
        .into_iter()
        .collect();
        let values = reconstruct_args(&args).unwrap();
        assert_eq!(values[0], json!("EQabc"));
        assert_eq!(values[1], json!(["1", "2"]));
        assert_eq!(values[3], json!("plain"));
        assert_eq!(values[4], json!({"a": 1, "b": null}));
    }

    #[test]
    fn test_reconstruct_rejects_non_object_record() {
        let args: ArgumentMap = [("opts".to_string(), arg("nested", json!(5)))].into_iter().collect();
        assert!(matches!(reconstruct_args(&args), Err(Error::MalformedArguments(_))));

        let args: ArgumentMap = [("opts".to_string(), arg("nested", json!({"a": 1})))].into_iter().collect();
        assert!(matches!(reconstruct_args(&args), Err(Error::MalformedArguments(_))));
    }

    #[test]
    fn test_opaque_types_pass_through() {
        let args: ArgumentMap = [
            ("mode".to_string(), arg("SendMode", json!(1))),
            ("maybe".to_string(), arg("Maybe<Cell>", json!("te6cc"))),
            ("speed".to_string(), arg("\"fast\"", json!("fast"))),
            ("dict".to_string(), arg("Dictionary<Address, bigint>", Value::Null)),
            ("pick".to_string(), arg("union", json!({"amount": {"value": "5"}}))),
        ]
        .into_iter()
        .collect();
        let values = reconstruct_args(&args).unwrap();
        assert_eq!(
            values,
            vec![json!(1), json!("te6cc"), json!("fast"), Value::Null, json!({"amount": "5"})]
        );
    }

    #[test]
    fn test_get_invokes_without_sender() {
        let fx = fixture();
        let bridge = Bridge::new(fx.loader.clone());
        let result = bridge
            .get(&Address::from("EQc"), "./wrappers/Counter", "Counter", "getCounter", &ArgumentMap::new())
            .unwrap();
        assert_eq!(result, json!(42));
        let calls = fx.calls.lock().unwrap();
        assert_eq!(calls[0], ("getCounter".to_string(), false, vec![]));
    }

    #[test]
    fn test_send_passes_sender_and_positional_args() {
        let fx = fixture();
        let bridge = Bridge::new(fx.loader.clone()).with_sender(Arc::new(TestSender));
        bridge
            .send(&Address::from("EQc"), "./wrappers/Counter.ts", "Counter", "sendIncrease", &sample_args())
            .unwrap();
        let calls = fx.calls.lock().unwrap();
        assert_eq!(calls[0], ("sendIncrease".to_string(), true, vec![json!("10"), json!({"x": 5})]));
    }

    #[test]
    fn test_send_without_sender_makes_no_call() {
        let fx = fixture();
        let bridge = Bridge::new(fx.loader.clone());
        let err = bridge
            .send(&Address::from("EQc"), "./wrappers/Counter.ts", "Counter", "sendIncrease", &sample_args())
            .unwrap_err();
        assert!(matches!(err, Error::NoSender));
        assert!(fx.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_lookup_failures() {
        let fx = fixture();
        let bridge = Bridge::new(fx.loader.clone());
        let at = Address::from("EQc");
        let none = ArgumentMap::new();

        let err = bridge.get(&at, "./wrappers/Missing.ts", "Counter", "getCounter", &none).unwrap_err();
        assert!(matches!(err, Error::ModuleNotFound(_)));
        let err = bridge.get(&at, "./wrappers/Counter.ts", "Other", "getCounter", &none).unwrap_err();
        assert!(matches!(err, Error::ClassNotFound { .. }));
        let err = bridge.get(&at, "./wrappers/Counter.ts", "Counter", "getNothing", &none).unwrap_err();
        assert!(matches!(err, Error::OperationNotFound { .. }));
        assert!(fx.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_operation_error_surfaces_unchanged() {
        let fx = fixture();
        let bridge = Bridge::new(fx.loader.clone()).with_sender(Arc::new(TestSender));
        let err = bridge
            .send(&Address::from("EQc"), "./wrappers/Counter.ts", "Counter", "sendFail", &ArgumentMap::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invocation error: exit code 37");
    }

    fn config_type() -> Parameters {
        [
            ("id".to_string(), ParamInfo::primitive("number")),
            ("counter".to_string(), ParamInfo::primitive("number")),
        ]
        .into_iter()
        .collect()
    }

    fn deploy_args() -> ArgumentMap {
        [
            ("id".to_string(), arg("number", json!(7))),
            ("counter".to_string(), arg("number", json!(0))),
            ("value".to_string(), arg("bigint", json!("50000000"))),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_deploy_splits_config_and_returns_address() {
        let fx = fixture();
        let bridge = Bridge::new(fx.loader.clone()).with_sender(Arc::new(TestSender));
        let address = bridge
            .deploy("./wrappers/Counter.ts", "Counter", &deploy_args(), &config_type(), "b5ee9c72")
            .unwrap();
        assert_eq!(address, Address::from("EQnew"));

        let (config, code) = fx.deployed.lock().unwrap().clone().unwrap();
        assert_eq!(config, json!({"id": 7, "counter": 0}));
        assert_eq!(code, vec![0xb5, 0xee, 0x9c, 0x72]);
        let calls = fx.calls.lock().unwrap();
        assert_eq!(calls[0], ("sendDeploy".to_string(), true, vec![json!("50000000")]));
    }

    #[test]
    fn test_deploy_failures() {
        let fx = fixture();
        let without_sender = Bridge::new(fx.loader.clone());
        let err = without_sender
            .deploy("./wrappers/Counter.ts", "Counter", &deploy_args(), &config_type(), "00")
            .unwrap_err();
        assert!(matches!(err, Error::NoSender));

        let bridge = Bridge::new(fx.loader.clone()).with_sender(Arc::new(TestSender));
        let err = bridge
            .deploy("./wrappers/Counter.ts", "Counter", &deploy_args(), &config_type(), "xyz")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBytecode(_)));
        assert!(fx.deployed.lock().unwrap().is_none());
    }

    fn wrapper() -> WrapperInfo {
        let mut info = WrapperInfo {
            path: "./wrappers/Counter.ts".into(),
            deploy: DeployData {
                can_be_created_from_config: true,
                config_type: Some(config_type()),
                code_hex: Some("b5ee9c72".into()),
            },
            ..Default::default()
        };
        info.send_functions.insert(
            "sendDeploy".into(),
            [("value".to_string(), ParamInfo::primitive("bigint"))].into_iter().collect(),
        );
        let cfg: Parameters = [("x".to_string(), ParamInfo::primitive("number"))].into_iter().collect();
        info.send_functions.insert(
            "sendIncrease".into(),
            [
                ("amount".to_string(), ParamInfo::primitive("bigint")),
                ("cfg".to_string(), ParamInfo::nested(cfg)),
            ]
            .into_iter()
            .collect(),
        );
        info.get_functions.insert("getCounter".into(), Parameters::new());
        info
    }

    #[test]
    fn test_checked_calls_validate_shape() {
        let fx = fixture();
        let bridge = Bridge::new(fx.loader.clone()).with_sender(Arc::new(TestSender));
        let info = wrapper();
        let at = Address::from("EQc");

        bridge.checked_send(&info, "Counter", "sendIncrease", &at, &sample_args()).unwrap();

        let mut extra = sample_args();
        extra.insert("bonus".into(), arg("number", json!(1)));
        let err = bridge.checked_send(&info, "Counter", "sendIncrease", &at, &extra).unwrap_err();
        assert!(err.to_string().contains("unexpected argument 'bonus'"));

        let mut missing = sample_args();
        missing.shift_remove("cfg");
        let err = bridge.checked_send(&info, "Counter", "sendIncrease", &at, &missing).unwrap_err();
        assert!(err.to_string().contains("missing argument 'cfg'"));

        let mut retyped = sample_args();
        retyped["amount"].ty = "number".into();
        assert!(matches!(
            bridge.checked_send(&info, "Counter", "sendIncrease", &at, &retyped),
            Err(Error::MalformedArguments(_))
        ));

        assert_eq!(fx.calls.lock().unwrap().len(), 1);
        assert_eq!(bridge.checked_get(&info, "Counter", "getCounter", &at, &ArgumentMap::new()).unwrap(), json!(42));
    }

    #[test]
    fn test_checked_deploy() {
        let fx = fixture();
        let bridge = Bridge::new(fx.loader.clone()).with_sender(Arc::new(TestSender));
        let info = wrapper();
        assert_eq!(bridge.checked_deploy(&info, "Counter", &deploy_args()).unwrap(), Address::from("EQnew"));

        let mut undeployable = wrapper();
        undeployable.deploy.code_hex = None;
        assert!(matches!(
            bridge.checked_deploy(&undeployable, "Counter", &deploy_args()),
            Err(Error::CapabilityError(_))
        ));
    }

    #[test]
    fn test_argument_map_from_json() {
        let args: ArgumentMap = serde_json::from_value(json!({
            "amount": {"type": "bigint", "optional": false, "value": "10"},
            "cfg": {"type": "nested", "value": {"x": {"value": 5}}}
        }))
        .unwrap();
        assert_eq!(args.keys().collect::<Vec<_>>(), vec!["amount", "cfg"]);
        assert_eq!(reconstruct_args(&args).unwrap(), vec![json!("10"), json!({"x": 5})]);
    }
}

//! Type reference resolver
//!
//! Resolves named types declared in one source unit into either a field
//! map (records, object aliases, interfaces) or rendered alias text, and
//! classifies type annotations as primitive, nested or union.
//!
//! Every name is resolved at most once per resolver. A name is marked
//! pending before its body is visited; meeting a pending name again means
//! the type graph is cyclic, and that reference is left opaque. Union
//! aliases being classified are tracked the same way.

use indexmap::IndexMap;
use tracing::trace;

use crate::parser::ast::{SourceUnit, TypeDecl, TypeDeclKind, TypeExpr, TypeMember};
use crate::schema::{DefinedType, DefinedTypes, ParamInfo, ParamType, Parameters, UnionMember};

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Done(DefinedType),
}

/// Per-unit resolver owning the memo table for one analysis pass
pub struct TypeResolver<'a> {
    unit: &'a SourceUnit,
    memo: IndexMap<String, Slot>,
    /// Union aliases whose members are being classified
    expanding: Vec<String>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(unit: &'a SourceUnit) -> Self {
        TypeResolver {
            unit,
            memo: IndexMap::new(),
            expanding: Vec::new(),
        }
    }

    /// Resolve a type declared in the unit. `None` when the unit does not
    /// declare `name`.
    pub fn resolve(&mut self, name: &str) -> Option<DefinedType> {
        let unit = self.unit;
        let decl = unit.type_decl(name)?;

        match self.memo.get(name) {
            Some(Slot::Done(shape)) => return Some(shape.clone()),
            Some(Slot::Pending) => {
                trace!(type_name = name, "cyclic type reference left opaque");
                return Some(DefinedType::Alias(name.to_string()));
            }
            None => {}
        }
        self.memo.insert(name.to_string(), Slot::Pending);

        let shape = match &decl.kind {
            TypeDeclKind::Alias(body) => self.resolve_body(body),
            TypeDeclKind::Interface { extends, members } => {
                let mut fields = Parameters::new();
                for parent in extends {
                    let inherited = parent
                        .bare_reference()
                        .and_then(|parent| self.resolve(parent))
                        .and_then(|shape| match shape {
                            DefinedType::Record(fields) => Some(fields),
                            DefinedType::Alias(_) => None,
                        });
                    if let Some(inherited) = inherited {
                        fields.extend(inherited);
                    }
                }
                fields.extend(self.fields_of(members));
                DefinedType::Record(fields)
            }
        };

        self.memo.insert(name.to_string(), Slot::Done(shape.clone()));
        Some(shape)
    }

    /// Resolve `name` and keep it only if it is a record
    pub fn resolve_record(&mut self, name: &str) -> Option<Parameters> {
        match self.resolve(name)? {
            DefinedType::Record(fields) => Some(fields),
            DefinedType::Alias(_) => None,
        }
    }

    fn resolve_body(&mut self, body: &TypeExpr) -> DefinedType {
        match strip_parens(body) {
            TypeExpr::Object(members) => DefinedType::Record(self.fields_of(members)),
            expr @ TypeExpr::Reference { .. } => match expr.bare_reference() {
                // alias chain within the unit
                Some(target) if self.unit.declares_type(target) => self
                    .resolve(target)
                    .unwrap_or_else(|| DefinedType::Alias(target.to_string())),
                _ => DefinedType::Alias(expr.to_string()),
            },
            TypeExpr::Intersection(parts) => {
                let mut merged = Parameters::new();
                for part in parts {
                    match self.resolve_body(part) {
                        DefinedType::Record(fields) => merged.extend(fields),
                        DefinedType::Alias(_) => return DefinedType::Alias(body.to_string()),
                    }
                }
                DefinedType::Record(merged)
            }
            _ => DefinedType::Alias(body.to_string()),
        }
    }

    fn fields_of(&mut self, members: &[TypeMember]) -> Parameters {
        let mut fields = Parameters::new();
        for member in members {
            if let TypeMember::Property {
                name,
                optional,
                annotation: Some(annotation),
                ..
            } = member
            {
                let ty = self.classify(annotation);
                fields.insert(name.clone(), ParamInfo::new(ty).optional(*optional));
            }
        }
        fields
    }

    /// Classify a parameter or field annotation
    pub fn classify(&mut self, ty: &TypeExpr) -> ParamType {
        match strip_parens(ty) {
            TypeExpr::Union(members) => {
                ParamType::Union(members.iter().map(|member| self.union_member(member)).collect())
            }
            TypeExpr::Object(members) => ParamType::Nested(self.fields_of(members)),
            expr => {
                let Some(name) = expr.bare_reference() else {
                    return ParamType::Primitive(expr.to_string());
                };
                if let Some(union) = self.union_body(name) {
                    if self.expanding.iter().any(|n| n == name) {
                        trace!(type_name = name, "cyclic union alias left opaque");
                        return ParamType::Primitive(name.to_string());
                    }
                    self.expanding.push(name.to_string());
                    let ty = self.classify(union);
                    self.expanding.pop();
                    return ty;
                }
                match self.resolve(name) {
                    Some(DefinedType::Record(fields)) => ParamType::Nested(fields),
                    _ => ParamType::Primitive(name.to_string()),
                }
            }
        }
    }

    fn union_member(&mut self, member: &TypeExpr) -> UnionMember {
        let member = strip_parens(member);
        if let TypeExpr::Object(members) = member {
            return UnionMember::Record(self.fields_of(members));
        }
        if let Some(name) = member.bare_reference() {
            if let Some(fields) = self.resolve_record(name) {
                return UnionMember::Record(fields);
            }
        }
        UnionMember::Primitive(member.to_string())
    }

    /// Follow a same-unit alias chain from `name`; returns the union body
    /// it ends in, if any.
    fn union_body(&self, name: &str) -> Option<&'a TypeExpr> {
        let unit: &'a SourceUnit = self.unit;
        let mut seen: Vec<&str> = Vec::new();
        let mut current = name;
        loop {
            if seen.contains(&current) {
                return None;
            }
            seen.push(current);
            let TypeDeclKind::Alias(body) = &unit.type_decl(current)?.kind else {
                return None;
            };
            match strip_parens(body) {
                union @ TypeExpr::Union(_) => return Some(union),
                other => match other.bare_reference() {
                    Some(next) => current = next,
                    None => return None,
                },
            }
        }
    }

    /// Resolve every same-unit type referenced anywhere inside `ty`
    pub fn note_references(&mut self, ty: &TypeExpr) {
        let mut names: Vec<String> = Vec::new();
        ty.for_each_reference(&mut |name| names.push(name.to_string()));
        self.resolve_declared(names);
    }

    /// Resolve every same-unit type referenced by a declaration's body
    pub fn note_declaration(&mut self, decl: &TypeDecl) {
        let mut names: Vec<String> = Vec::new();
        match &decl.kind {
            TypeDeclKind::Alias(body) => body.for_each_reference(&mut |name| names.push(name.to_string())),
            TypeDeclKind::Interface { extends, members } => {
                for parent in extends {
                    parent.for_each_reference(&mut |name| names.push(name.to_string()));
                }
                for member in members {
                    member.for_each_reference(&mut |name| names.push(name.to_string()));
                }
            }
        }
        self.resolve_declared(names);
    }

    fn resolve_declared(&mut self, names: Vec<String>) {
        for name in names {
            if self.unit.declares_type(&name) {
                self.resolve(&name);
            }
        }
    }

    /// Resolved types in resolution order
    pub fn defined_types(&self) -> DefinedTypes {
        self.memo
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Done(shape) => Some((name.clone(), shape.clone())),
                Slot::Pending => None,
            })
            .collect()
    }
}

fn strip_parens(mut ty: &TypeExpr) -> &TypeExpr {
    while let TypeExpr::Parenthesized(inner) = ty {
        ty = inner;
    }
    ty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn resolve(source: &str, name: &str) -> Option<DefinedType> {
        let unit = parse(source).unwrap();
        TypeResolver::new(&unit).resolve(name)
    }

    fn record(source: &str, name: &str) -> Parameters {
        match resolve(source, name) {
            Some(DefinedType::Record(fields)) => fields,
            other => panic!("expected record for {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_alias_chain_resolves_to_record() {
        let fields = record("type A = B;\ntype B = C;\ntype C = { x: number };", "A");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["x"], ParamInfo::primitive("number"));
    }

    #[test]
    fn test_alias_to_external_type_is_text() {
        assert_eq!(
            resolve("type Amounts = Array<bigint>;", "Amounts"),
            Some(DefinedType::Alias("Array<bigint>".into()))
        );
        assert_eq!(resolve("type A = { x: number };", "Missing"), None);
    }

    #[test]
    fn test_union_alias_classifies_as_union() {
        let source = "type A = { x: number; y?: Address };\ntype U = A | string;";
        let unit = parse(source).unwrap();
        let mut resolver = TypeResolver::new(&unit);

        let ty = resolver.classify(&TypeExpr::reference("U"));
        let expected_a: Parameters = [
            ("x".to_string(), ParamInfo::primitive("number")),
            ("y".to_string(), ParamInfo::primitive("Address").optional(true)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            ty,
            ParamType::Union(vec![
                UnionMember::Record(expected_a),
                UnionMember::Primitive("string".into())
            ])
        );
        assert_eq!(resolver.resolve("U"), Some(DefinedType::Alias("A | string".into())));
    }

    #[test]
    fn test_record_field_kinds() {
        let fields = record(
            "type Inner = { v: bigint };\ntype Outer = { inner: Inner; list: Inner[]; pick: 'a' | Inner; inline: { z: Cell } };",
            "Outer",
        );
        assert!(matches!(&fields["inner"].ty, ParamType::Nested(f) if f.contains_key("v")));
        assert_eq!(fields["list"].ty, ParamType::Primitive("Inner[]".into()));
        assert!(matches!(&fields["pick"].ty, ParamType::Union(m) if m.len() == 2));
        assert!(matches!(&fields["inline"].ty, ParamType::Nested(f) if f.contains_key("z")));
    }

    #[test]
    fn test_interface_extends_parent_fields_first() {
        let fields = record(
            "interface Base { id: number }\ninterface Child extends Base { name: string }",
            "Child",
        );
        let keys: Vec<&String> = fields.keys().collect();
        assert_eq!(keys, vec!["id", "name"]);
    }

    #[test]
    fn test_intersection_of_records_merges() {
        let fields = record("type A = { a: number };\ntype B = A & { b: string };", "B");
        let keys: Vec<&String> = fields.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);

        assert_eq!(
            resolve("type C = { a: number } & Partial<X>;", "C"),
            Some(DefinedType::Alias("{ a: number } & Partial<X>".into()))
        );
    }

    #[test]
    fn test_self_referential_type_terminates() {
        let fields = record("type Node = { value: number; next?: Node };", "Node");
        assert_eq!(fields["next"].ty, ParamType::Primitive("Node".into()));
        assert!(fields["next"].optional);
    }

    #[test]
    fn test_recursive_union_alias_terminates() {
        let unit = parse("type List = { head: number; tail: List } | null;").unwrap();
        let mut resolver = TypeResolver::new(&unit);
        let ty = resolver.classify(&TypeExpr::reference("List"));
        let node: Parameters = [
            ("head".to_string(), ParamInfo::primitive("number")),
            ("tail".to_string(), ParamInfo::primitive("List")),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            ty,
            ParamType::Union(vec![UnionMember::Record(node), UnionMember::Primitive("null".into())])
        );

        let source = "type Tree = { kids: Forest } | string;\ntype Forest = { first: Tree };";
        let unit = parse(source).unwrap();
        let mut resolver = TypeResolver::new(&unit);
        assert!(matches!(resolver.classify(&TypeExpr::reference("Tree")), ParamType::Union(_)));
    }

    #[test]
    fn test_mutually_referential_types_terminate() {
        let source = "type A = { b: B };\ntype B = { a: A };\ntype L = M;\ntype M = L;";
        let unit = parse(source).unwrap();
        let mut resolver = TypeResolver::new(&unit);
        let a = resolver.resolve_record("A").unwrap();
        match &a["b"].ty {
            ParamType::Nested(b) => assert_eq!(b["a"].ty, ParamType::Primitive("A".into())),
            other => panic!("unexpected {:?}", other),
        }
        assert!(resolver.resolve("L").is_some());
        assert_eq!(resolver.classify(&TypeExpr::reference("L")), ParamType::Primitive("L".into()));
    }

    #[test]
    fn test_memo_reuses_resolution() {
        let unit = parse("type A = { x: number };\ntype B = { a: A };").unwrap();
        let mut resolver = TypeResolver::new(&unit);
        resolver.resolve("B");
        resolver.resolve("A");
        let names: Vec<String> = resolver.defined_types().keys().cloned().collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_note_references_only_declared() {
        let unit = parse("type Opts = { v: bigint };").unwrap();
        let mut resolver = TypeResolver::new(&unit);
        let ty = crate::parser::parse("type T = Array<Opts> | Maybe<Cell>;").unwrap();
        if let TypeDeclKind::Alias(body) = &ty.type_decls[0].kind {
            resolver.note_references(body);
        }
        let names: Vec<String> = resolver.defined_types().keys().cloned().collect();
        assert_eq!(names, vec!["Opts"]);
    }

    #[test]
    fn test_resolution_determinism_100_iterations() {
        let source = "type Inner = { v: bigint; w?: Inner };\ninterface Cfg { id: number; inner: Inner; mode: 'a' | Inner }";
        let first = resolve(source, "Cfg");
        for i in 0..100 {
            assert_eq!(first, resolve(source, "Cfg"), "Determinism failure at iteration {}", i);
        }
    }
}

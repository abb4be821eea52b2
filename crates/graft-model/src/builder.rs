use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::call::{Argument, CallKind, CallSite, NameRef, Receiver};
use crate::decl::{
    CallSiteId, DeclId, DeclKind, Declaration, Modifiers, Nesting, TypeParam, UnitId, Visibility,
};
use crate::program::{CaptureEdge, CompilationUnit, Program};
use crate::text::{Span, TextRange};
use crate::types::TypeRef;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("supertype cycle through `{0}`")]
    SupertypeCycle(String),
    #[error("declaration `{decl}` has no rendered body to locate `{marker}` in")]
    NoBody { decl: String, marker: String },
    #[error("marker `{marker}` (occurrence {occurrence}) not found in `{decl}`")]
    MarkerNotFound {
        decl: String,
        marker: String,
        occurrence: usize,
    },
}

#[derive(Debug)]
struct PendingCall {
    enclosing: DeclId,
    marker: String,
    occurrence: usize,
    name: String,
    receiver: Receiver,
    receiver_ty: Option<TypeRef>,
    args: Vec<Argument>,
    kind: CallKind,
    outer_qualifier: Option<String>,
}

#[derive(Debug)]
struct PendingRef {
    enclosing: DeclId,
    marker: String,
    occurrence: usize,
    target: DeclId,
    in_array_initializer: bool,
}

#[derive(Debug)]
struct PendingLocal {
    decl: DeclId,
    method: DeclId,
}

/// Builds an immutable [`Program`] snapshot, standing in for the external
/// parser/binder.
///
/// The builder renders canonical unit text from the registered declarations
/// (so spans stay consistent by construction) and locates call sites and name
/// references by marker text within the enclosing member's rendered body.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    decls: Vec<Declaration>,
    units: Vec<(String, Vec<DeclId>)>,
    calls: Vec<PendingCall>,
    refs: Vec<PendingRef>,
    locals: Vec<PendingLocal>,
    captures: Vec<CaptureEdge>,
    marker_counts: HashMap<(DeclId, String), usize>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(&mut self, path: impl Into<String>) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push((path.into(), Vec::new()));
        id
    }

    fn push_decl(&mut self, decl: Declaration) -> DeclId {
        let id = decl.id;
        self.decls.push(decl);
        id
    }

    fn new_decl(&mut self, name: &str, kind: DeclKind) -> Declaration {
        Declaration {
            id: DeclId(self.decls.len() as u32),
            name: name.to_string(),
            kind,
            modifiers: Modifiers::default(),
            nesting: Nesting::default(),
            enclosing: None,
            type_params: Vec::new(),
            supertypes: Vec::new(),
            ty: None,
            params: Vec::new(),
            is_varargs: false,
            span: None,
            body: None,
        }
    }

    pub fn class(&mut self, unit: UnitId, name: &str) -> DeclId {
        let decl = self.new_decl(name, DeclKind::Class);
        let id = self.push_decl(decl);
        self.units[unit.as_usize()].1.push(id);
        id
    }

    pub fn interface(&mut self, unit: UnitId, name: &str) -> DeclId {
        let decl = self.new_decl(name, DeclKind::Interface);
        let id = self.push_decl(decl);
        self.units[unit.as_usize()].1.push(id);
        id
    }

    /// A type declared as a member of another type.
    pub fn member_class(&mut self, enclosing: DeclId, name: &str) -> DeclId {
        let mut decl = self.new_decl(name, DeclKind::Class);
        decl.enclosing = Some(enclosing);
        decl.nesting = Nesting::Member;
        self.push_decl(decl)
    }

    /// A local or anonymous type nested inside a method. Not rendered; its
    /// text lives in the enclosing method body.
    pub fn nested_class(&mut self, method: DeclId, name: &str, nesting: Nesting) -> DeclId {
        let mut decl = self.new_decl(name, DeclKind::Class);
        decl.enclosing = Some(method);
        decl.nesting = nesting;
        self.push_decl(decl)
    }

    pub fn extends(&mut self, sub: DeclId, sup: DeclId) {
        let sup_ref = TypeRef::named(sup);
        self.decls[sub.as_usize()].supertypes.push(sup_ref);
    }

    pub fn field(&mut self, class: DeclId, name: &str, ty: TypeRef) -> DeclId {
        self.field_init(class, name, ty, None)
    }

    pub fn field_init(
        &mut self,
        class: DeclId,
        name: &str,
        ty: TypeRef,
        init: Option<&str>,
    ) -> DeclId {
        let mut decl = self.new_decl(name, DeclKind::Field);
        decl.enclosing = Some(class);
        decl.ty = Some(ty);
        decl.body = init.map(str::to_string);
        self.push_decl(decl)
    }

    /// Add a method with an optional body. `ret` of `None` renders `void`.
    pub fn method(
        &mut self,
        class: DeclId,
        name: &str,
        ret: Option<TypeRef>,
        params: &[(&str, TypeRef)],
        body: Option<&str>,
    ) -> DeclId {
        let mut decl = self.new_decl(name, DeclKind::Method);
        decl.enclosing = Some(class);
        decl.ty = ret;
        decl.body = body.map(str::to_string);
        decl.modifiers.is_abstract = body.is_none();
        let method_id = decl.id;
        let id = self.push_decl(decl);
        for (pname, pty) in params {
            let mut p = self.new_decl(pname, DeclKind::Parameter);
            p.enclosing = Some(method_id);
            p.ty = Some(pty.clone());
            let pid = self.push_decl(p);
            self.decls[id.as_usize()].params.push(pid);
        }
        id
    }

    /// A local variable declared in `method`'s body as `<ty> <name> = <init>;`.
    /// The statement must appear verbatim in the body text.
    pub fn local(&mut self, method: DeclId, name: &str, ty: TypeRef, init: &str) -> DeclId {
        let mut decl = self.new_decl(name, DeclKind::Local);
        decl.enclosing = Some(method);
        decl.ty = Some(ty);
        decl.body = Some(init.to_string());
        let id = self.push_decl(decl);
        self.locals.push(PendingLocal { decl: id, method });
        // The declaration consumes the first occurrence of its own name, so
        // subsequently registered name refs match the *uses* in body order.
        let _ = self.next_occurrence(method, name);
        id
    }

    pub fn modifiers_mut(&mut self, decl: DeclId) -> &mut Modifiers {
        &mut self.decls[decl.as_usize()].modifiers
    }

    pub fn set_visibility(&mut self, decl: DeclId, visibility: Visibility) {
        self.decls[decl.as_usize()].modifiers.visibility = visibility;
    }

    pub fn set_static(&mut self, decl: DeclId) {
        self.decls[decl.as_usize()].modifiers.is_static = true;
    }

    pub fn set_abstract(&mut self, decl: DeclId) {
        self.decls[decl.as_usize()].modifiers.is_abstract = true;
    }

    pub fn set_varargs(&mut self, method: DeclId) {
        self.decls[method.as_usize()].is_varargs = true;
    }

    pub fn type_param(&mut self, decl: DeclId, name: &str, bounds: Vec<TypeRef>) {
        self.decls[decl.as_usize()].type_params.push(TypeParam {
            name: name.to_string(),
            bounds,
        });
    }

    pub fn capture(&mut self, nested: DeclId, outer: DeclId, handle: Option<&str>) {
        self.captures.push(CaptureEdge {
            nested,
            outer,
            handle: handle.map(str::to_string),
        });
    }

    fn next_occurrence(&mut self, enclosing: DeclId, marker: &str) -> usize {
        let counter = self
            .marker_counts
            .entry((enclosing, marker.to_string()))
            .or_insert(0);
        let occurrence = *counter;
        *counter += 1;
        occurrence
    }

    /// Register an invocation whose text `marker` appears in the rendered
    /// body of `enclosing`. Repeated identical markers are matched in order.
    #[allow(clippy::too_many_arguments)]
    pub fn invoke(
        &mut self,
        enclosing: DeclId,
        marker: &str,
        name: &str,
        receiver: Receiver,
        receiver_ty: Option<TypeRef>,
        args: Vec<Argument>,
    ) -> CallSiteId {
        self.invoke_full(
            enclosing,
            marker,
            name,
            receiver,
            receiver_ty,
            args,
            CallKind::Invocation,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn invoke_full(
        &mut self,
        enclosing: DeclId,
        marker: &str,
        name: &str,
        receiver: Receiver,
        receiver_ty: Option<TypeRef>,
        args: Vec<Argument>,
        kind: CallKind,
        outer_qualifier: Option<&str>,
    ) -> CallSiteId {
        let occurrence = self.next_occurrence(enclosing, marker);
        let id = CallSiteId(self.calls.len() as u32);
        self.calls.push(PendingCall {
            enclosing,
            marker: marker.to_string(),
            occurrence,
            name: name.to_string(),
            receiver,
            receiver_ty,
            args,
            kind,
            outer_qualifier: outer_qualifier.map(str::to_string),
        });
        id
    }

    /// Register an identifier use of `target` inside `enclosing`'s body.
    pub fn name_ref(&mut self, enclosing: DeclId, marker: &str, target: DeclId) {
        self.name_ref_full(enclosing, marker, target, false);
    }

    pub fn name_ref_full(
        &mut self,
        enclosing: DeclId,
        marker: &str,
        target: DeclId,
        in_array_initializer: bool,
    ) {
        let occurrence = self.next_occurrence(enclosing, marker);
        self.refs.push(PendingRef {
            enclosing,
            marker: marker.to_string(),
            occurrence,
            target,
            in_array_initializer,
        });
    }

    pub fn finish(mut self) -> Result<Program, ModelError> {
        self.check_supertype_cycles()?;

        let mut units = Vec::new();
        // Absolute body range per member, used to locate markers.
        let mut body_ranges: HashMap<DeclId, TextRange> = HashMap::new();

        let unit_sketches = std::mem::take(&mut self.units);
        for (idx, (path, top_level)) in unit_sketches.iter().enumerate() {
            let unit_id = UnitId(idx as u32);
            let mut text = String::new();
            for (n, ty) in top_level.iter().enumerate() {
                if n > 0 {
                    text.push('\n');
                }
                self.render_type(unit_id, *ty, "", &mut text, &mut body_ranges);
            }
            units.push(CompilationUnit {
                id: unit_id,
                path: path.clone(),
                text,
            });
        }

        self.locate_locals(&units, &body_ranges)?;

        let mut call_sites = Vec::new();
        for (idx, call) in self.calls.iter().enumerate() {
            let range = self.locate(&units, &body_ranges, call.enclosing, &call.marker, call.occurrence)?;
            let unit = self.unit_of(call.enclosing);
            call_sites.push(CallSite {
                id: CallSiteId(idx as u32),
                unit,
                range,
                enclosing: call.enclosing,
                name: call.name.clone(),
                receiver: call.receiver.clone(),
                receiver_ty: call.receiver_ty.clone(),
                args: call.args.clone(),
                kind: call.kind,
                outer_qualifier: call.outer_qualifier.clone(),
            });
        }

        let mut refs = Vec::new();
        for r in &self.refs {
            let range = self.locate(&units, &body_ranges, r.enclosing, &r.marker, r.occurrence)?;
            refs.push(NameRef {
                unit: self.unit_of(r.enclosing),
                range,
                target: r.target,
                enclosing: r.enclosing,
                in_array_initializer: r.in_array_initializer,
            });
        }

        Ok(Program {
            decls: self.decls,
            units,
            call_sites,
            refs,
            captures: self.captures,
        })
    }

    fn check_supertype_cycles(&self) -> Result<(), ModelError> {
        for decl in &self.decls {
            if !decl.is_type() {
                continue;
            }
            let mut seen = HashSet::new();
            let mut queue: Vec<DeclId> = direct_supers(&self.decls, decl.id);
            while let Some(next) = queue.pop() {
                if next == decl.id {
                    return Err(ModelError::SupertypeCycle(decl.name.clone()));
                }
                if seen.insert(next) {
                    queue.extend(direct_supers(&self.decls, next));
                }
            }
        }
        Ok(())
    }

    fn unit_of(&self, decl: DeclId) -> UnitId {
        let mut cur = decl;
        loop {
            match self.decls[cur.as_usize()].enclosing {
                Some(up) => cur = up,
                None => break,
            }
        }
        // Top-level decls are registered in exactly one unit sketch; the
        // sketches were drained in finish(), so recover via span instead.
        self.decls[cur.as_usize()]
            .span
            .map(|s| s.unit)
            .expect("top-level declaration was rendered")
    }

    fn render_type(
        &mut self,
        unit: UnitId,
        ty: DeclId,
        indent: &str,
        out: &mut String,
        body_ranges: &mut HashMap<DeclId, TextRange>,
    ) {
        let start = out.len();
        let decl = self.decls[ty.as_usize()].clone();
        out.push_str(indent);
        push_modifiers(out, &decl.modifiers, decl.kind);
        out.push_str(match decl.kind {
            DeclKind::Interface => "interface ",
            _ => "class ",
        });
        out.push_str(&decl.name);
        self.push_heritage(out, &decl);
        out.push_str(" {\n");

        let member_indent = format!("{indent}    ");
        let members: Vec<DeclId> = self
            .decls
            .iter()
            .filter(|d| {
                d.enclosing == Some(ty) && !matches!(d.kind, DeclKind::Parameter | DeclKind::Local)
            })
            .map(|d| d.id)
            .collect();
        for (n, member) in members.iter().enumerate() {
            if n > 0 {
                out.push('\n');
            }
            let kind = self.decls[member.as_usize()].kind;
            match kind {
                DeclKind::Class | DeclKind::Interface => {
                    self.render_type(unit, *member, &member_indent, out, body_ranges);
                }
                DeclKind::Field => self.render_field(unit, *member, &member_indent, out),
                DeclKind::Method | DeclKind::Constructor => {
                    self.render_method(unit, *member, &member_indent, out, body_ranges);
                }
                DeclKind::Parameter | DeclKind::Local => {}
            }
        }

        out.push_str(indent);
        out.push_str("}\n");
        self.decls[ty.as_usize()].span = Some(Span::new(unit, TextRange::new(start, out.len())));
    }

    fn push_heritage(&self, out: &mut String, decl: &Declaration) {
        let mut extends = Vec::new();
        let mut implements = Vec::new();
        for sup in &decl.supertypes {
            let name = match sup {
                TypeRef::Named { decl: id, .. } => self.decls[id.as_usize()].name.clone(),
                TypeRef::Unresolved(name) => name.clone(),
                other => format!("{other:?}"),
            };
            let is_interface = match sup {
                TypeRef::Named { decl: id, .. } => {
                    self.decls[id.as_usize()].kind == DeclKind::Interface
                }
                _ => false,
            };
            if decl.kind == DeclKind::Interface || !is_interface {
                extends.push(name);
            } else {
                implements.push(name);
            }
        }
        if !extends.is_empty() {
            out.push_str(" extends ");
            out.push_str(&extends.join(", "));
        }
        if !implements.is_empty() {
            out.push_str(" implements ");
            out.push_str(&implements.join(", "));
        }
    }

    fn render_field(&mut self, unit: UnitId, field: DeclId, indent: &str, out: &mut String) {
        let start = out.len();
        let decl = self.decls[field.as_usize()].clone();
        out.push_str(indent);
        push_modifiers(out, &decl.modifiers, decl.kind);
        out.push_str(&self.display_type_local(decl.ty.as_ref()));
        out.push(' ');
        out.push_str(&decl.name);
        if let Some(init) = &decl.body {
            out.push_str(" = ");
            out.push_str(init);
        }
        out.push_str(";\n");
        self.decls[field.as_usize()].span = Some(Span::new(unit, TextRange::new(start, out.len())));
    }

    fn render_method(
        &mut self,
        unit: UnitId,
        method: DeclId,
        indent: &str,
        out: &mut String,
        body_ranges: &mut HashMap<DeclId, TextRange>,
    ) {
        let start = out.len();
        let decl = self.decls[method.as_usize()].clone();
        out.push_str(indent);
        push_modifiers(out, &decl.modifiers, decl.kind);
        if !decl.type_params.is_empty() {
            let names: Vec<&str> = decl.type_params.iter().map(|tp| tp.name.as_str()).collect();
            out.push('<');
            out.push_str(&names.join(", "));
            out.push_str("> ");
        }
        if decl.kind == DeclKind::Method {
            out.push_str(&match &decl.ty {
                Some(ty) => self.display_type_local(Some(ty)),
                None => "void".to_string(),
            });
            out.push(' ');
        }
        out.push_str(&decl.name);
        out.push('(');
        for (n, param) in decl.params.iter().enumerate() {
            if n > 0 {
                out.push_str(", ");
            }
            let p = &self.decls[param.as_usize()];
            let varargs_last = decl.is_varargs && n + 1 == decl.params.len();
            let ty_text = match (&p.ty, varargs_last) {
                (Some(TypeRef::Array(elem)), true) => {
                    format!("{}...", self.display_type_local(Some(elem)))
                }
                (ty, _) => self.display_type_local(ty.as_ref()),
            };
            out.push_str(&ty_text);
            out.push(' ');
            out.push_str(&p.name);
        }
        out.push(')');

        match &decl.body {
            None => out.push_str(";\n"),
            Some(body) => {
                out.push_str(" {\n");
                let body_indent = format!("{indent}    ");
                let body_start = out.len();
                for line in body.lines() {
                    if line.trim().is_empty() {
                        out.push('\n');
                    } else {
                        out.push_str(&body_indent);
                        out.push_str(line);
                        out.push('\n');
                    }
                }
                body_ranges.insert(method, TextRange::new(body_start, out.len()));
                out.push_str(indent);
                out.push_str("}\n");
            }
        }
        self.decls[method.as_usize()].span =
            Some(Span::new(unit, TextRange::new(start, out.len())));
    }

    fn display_type_local(&self, ty: Option<&TypeRef>) -> String {
        match ty {
            None => "void".to_string(),
            Some(TypeRef::Primitive(p)) => p.keyword().to_string(),
            Some(TypeRef::Named { decl, args }) => {
                let name = self.decls[decl.as_usize()].name.clone();
                if args.is_empty() {
                    name
                } else {
                    let args: Vec<String> = args
                        .iter()
                        .map(|a| self.display_type_local(Some(a)))
                        .collect();
                    format!("{}<{}>", name, args.join(", "))
                }
            }
            Some(TypeRef::Var(name)) => name.clone(),
            Some(TypeRef::Array(elem)) => format!("{}[]", self.display_type_local(Some(elem))),
            Some(TypeRef::Wildcard { upper }) => match upper {
                Some(bound) => format!("? extends {}", self.display_type_local(Some(bound))),
                None => "?".to_string(),
            },
            Some(TypeRef::Unresolved(name)) => {
                name.rsplit('.').next().unwrap_or(name).to_string()
            }
        }
    }

    fn locate_locals(
        &mut self,
        units: &[CompilationUnit],
        body_ranges: &HashMap<DeclId, TextRange>,
    ) -> Result<(), ModelError> {
        let pending = std::mem::take(&mut self.locals);
        for p in pending {
            let decl = self.decls[p.decl.as_usize()].clone();
            let ty_text = self.display_type_local(decl.ty.as_ref());
            let stmt = format!(
                "{} {} = {};",
                ty_text,
                decl.name,
                decl.body.as_deref().unwrap_or("")
            );
            let range = self.locate(units, body_ranges, p.method, &stmt, 0)?;
            let unit = self.unit_of(p.method);
            self.decls[p.decl.as_usize()].span = Some(Span::new(unit, range));
        }
        Ok(())
    }

    fn locate(
        &self,
        units: &[CompilationUnit],
        body_ranges: &HashMap<DeclId, TextRange>,
        enclosing: DeclId,
        marker: &str,
        occurrence: usize,
    ) -> Result<TextRange, ModelError> {
        let decl = &self.decls[enclosing.as_usize()];
        let body_range = match decl.kind {
            DeclKind::Field => decl.span.map(|s| s.range),
            _ => body_ranges.get(&enclosing).copied(),
        }
        .ok_or_else(|| ModelError::NoBody {
            decl: decl.name.clone(),
            marker: marker.to_string(),
        })?;
        let unit = self.unit_of(enclosing);
        let body = &units[unit.as_usize()].text[body_range.start..body_range.end];

        let mut search = 0usize;
        let mut remaining = occurrence;
        while let Some(rel) = body[search..].find(marker) {
            let at = search + rel;
            let before_ok = at == 0 || !is_ident_char(body.as_bytes()[at - 1]);
            let after = at + marker.len();
            let after_ok = after >= body.len() || !is_ident_char(body.as_bytes()[after]);
            // Identifier-boundary checks only matter for identifier markers.
            let boundary_ok = !marker
                .chars()
                .next()
                .map(|c| c.is_ascii_alphanumeric() || c == '_')
                .unwrap_or(false)
                || (before_ok && after_ok);
            if boundary_ok {
                if remaining == 0 {
                    return Ok(TextRange::new(
                        body_range.start + at,
                        body_range.start + at + marker.len(),
                    ));
                }
                remaining -= 1;
            }
            search = at + marker.len().max(1);
        }
        Err(ModelError::MarkerNotFound {
            decl: decl.name.clone(),
            marker: marker.to_string(),
            occurrence,
        })
    }
}

fn direct_supers(decls: &[Declaration], ty: DeclId) -> Vec<DeclId> {
    decls[ty.as_usize()]
        .supertypes
        .iter()
        .filter_map(|s| match s {
            TypeRef::Named { decl, .. } => Some(*decl),
            _ => None,
        })
        .collect()
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn push_modifiers(out: &mut String, modifiers: &Modifiers, kind: DeclKind) {
    let vis = modifiers.visibility.keyword();
    if !vis.is_empty() {
        out.push_str(vis);
        out.push(' ');
    }
    if modifiers.is_static {
        out.push_str("static ");
    }
    if modifiers.is_abstract && kind != DeclKind::Interface {
        out.push_str("abstract ");
    }
    if modifiers.is_final {
        out.push_str("final ");
    }
}

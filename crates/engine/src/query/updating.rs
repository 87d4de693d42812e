//! Evaluation of update expressions: targets and payloads are computed
//! against the unchanged table and recorded as pending primitives.

use super::context::QueryContext;
use super::expr::{Expr, InsertPosition};
use crate::data::NodeTable;
use crate::error::{Error, ErrorCode, Result};
use crate::model::NodeKind;
use crate::update::{UpdateOp, UpdatePrimitive};
use crate::xdm::{Item, atomize};

pub(crate) fn collect(expr: &Expr, ctx: &mut QueryContext<'_>) -> Result<()> {
    match expr {
        Expr::ReplaceNode { target, with } => {
            let target = single_target(ctx, target)?;
            let payload = payload(ctx, with)?;
            add(ctx, target, UpdateOp::ReplaceNode(payload))
        }
        Expr::Delete(target) => {
            for item in ctx.evaluate(target)? {
                let pre = item.as_node().ok_or_else(|| invalid_target("delete"))?;
                add(ctx, pre, UpdateOp::DeleteNode)?;
            }
            Ok(())
        }
        Expr::Insert { source, target, position } => {
            let target = single_target(ctx, target)?;
            let payload = payload(ctx, source)?;
            let (attrs, nodes) = payload.split_attributes()?;
            if !attrs.is_empty() {
                let owner = match position {
                    InsertPosition::Into => Some(target),
                    InsertPosition::Before => ctx.table().parent(target),
                };
                let owner = owner.ok_or_else(|| invalid_target("insert attributes"))?;
                add(ctx, owner, UpdateOp::InsertAttributes(attrs))?;
            }
            if !nodes.is_empty() {
                let op = match position {
                    InsertPosition::Into => UpdateOp::InsertInto(nodes),
                    InsertPosition::Before => UpdateOp::InsertBefore(nodes),
                };
                add(ctx, target, op)?;
            }
            Ok(())
        }
        Expr::ReplaceValue { target, value } => {
            let target = single_target(ctx, target)?;
            let items = ctx.evaluate(value)?;
            let value = atomize(&items, ctx.table());
            add(ctx, target, UpdateOp::ReplaceValue(value))
        }
        Expr::Rename { target, name } => {
            let target = single_target(ctx, target)?;
            let items = ctx.evaluate(name)?;
            let name = atomize(&items, ctx.table());
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(Error::type_error(format!("invalid name '{name}'")));
            }
            add(ctx, target, UpdateOp::Rename(name))
        }
        _ => Ok(()),
    }
}

fn add(ctx: &mut QueryContext<'_>, target: usize, op: UpdateOp) -> Result<()> {
    let prim = UpdatePrimitive::new(ctx.table(), target, op)?;
    ctx.updates_mut().add(prim)
}

fn invalid_target(what: &str) -> Error {
    Error::from_code(ErrorCode::XUTY0008, format!("target of {what} must be a node"))
}

fn single_target(ctx: &mut QueryContext<'_>, expr: &Expr) -> Result<usize> {
    match ctx.evaluate(expr)?.as_slice() {
        [Item::Node(n)] => Ok(n.pre),
        _ => Err(Error::from_code(ErrorCode::XUTY0008, "update target must be a single node")),
    }
}

/// Copies the nodes of `expr` into a fragment. Atomic values become one text
/// node; constructed fragments are taken as they are.
fn payload(ctx: &mut QueryContext<'_>, expr: &Expr) -> Result<NodeTable> {
    if let Expr::Fragment(fragment) = expr {
        return Ok(fragment.as_ref().clone());
    }
    let table = ctx.table();
    let items = ctx.evaluate(expr)?;
    let mut nodes = Vec::new();
    let mut atomics = Vec::new();
    for item in items {
        match item {
            Item::Node(n) if table.kind(n.pre) == NodeKind::Document => {
                nodes.extend(table.children(n.pre));
            }
            Item::Node(n) => nodes.push(n.pre),
            atomic => atomics.push(atomic),
        }
    }
    let mut fragment = table.extract(&nodes)?;
    if !atomics.is_empty() {
        let text = atomize(&atomics, table);
        fragment.append_text(&text)?;
    }
    Ok(fragment)
}

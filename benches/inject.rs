//! Benchmarks for graph transplantation.
//!
//! Measures closure injection over synthetic dependency chains: each type carries a field
//! of the next type and a method calling into it, so injecting the head drags the whole
//! chain through the worklist.

extern crate cilgraft;

use cilgraft::prelude::*;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Build an origin module with `depth` chained types.
fn chained_origin(depth: usize) -> (ModuleRc, TypeDefRc) {
    let origin = Module::new("payload.dll");

    let mut previous: Option<TypeDefRc> = None;
    for index in (0..depth).rev() {
        let ty = TypeDef::new("Payload", &format!("Link{index}"), TypeVisibility::PUBLIC.bits());
        origin.add_type(&ty);
        origin.issue_token(&MemberDef::Type(ty.clone()));

        if let Some(next) = &previous {
            let field = FieldDef::new("next", FieldAccessFlags::PRIVATE.bits());
            field.set_signature(FieldSignature {
                field_type: TypeSig::Class(TypeReference::to_def(next)),
            });
            ty.add_field(&field);
        }

        let method = MethodDef::new(
            "Run",
            MethodAccessFlags::PUBLIC.bits() | MethodModifiers::STATIC.bits(),
            0,
        );
        method.set_signature(MethodSignature {
            has_this: false,
            return_type: TypeSig::I4,
            params: vec![],
        });
        let mut body = CilBody::new();
        body.push(Instruction::new(
            opcodes::LDC_I4,
            Operand::Immediate(Immediate::Int32(index as i32)),
        ));
        if let Some(next) = &previous {
            let next_run = next.methods.iter().next().unwrap().1.clone();
            body.push(Instruction::new(
                opcodes::CALL,
                Operand::Member(MemberReference::to_def(&MemberDef::Method(next_run))),
            ));
            body.push(Instruction::new(opcodes::ADD, Operand::None));
        }
        body.push(Instruction::new(opcodes::RET, Operand::None));
        method.set_body(body);
        ty.add_method(&method);

        previous = Some(ty);
    }

    let head = previous.expect("depth > 0");
    (origin, head)
}

fn bench_inject_chain_closure(c: &mut Criterion) {
    for depth in [4usize, 32] {
        c.bench_function(&format!("inject_type_chain_{depth}"), |b| {
            b.iter_batched(
                || chained_origin(depth),
                |(origin, head)| {
                    let target = Module::new("app.dll");
                    let mut ctx = InjectContext::new(origin, target.clone());
                    let result =
                        inject_type(&head, &target, &mut ctx, &behavior::nop()).unwrap();
                    black_box(result.injected.len())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
}

fn bench_splice_heavy_edit(c: &mut Criterion) {
    c.bench_function("editor_insert_remove_512", |b| {
        b.iter_batched(
            || {
                let mut body = CilBody::new();
                for _ in 0..512 {
                    body.push(Instruction::new(opcodes::NOP, Operand::None));
                }
                body.push(Instruction::new(opcodes::RET, Operand::None));
                body
            },
            |mut body| {
                let anchor = body.instructions()[256].id();
                body.insert_before(
                    Some(anchor),
                    vec![Instruction::new(opcodes::NOP, Operand::None)],
                );
                body.remove(anchor);
                black_box(body.len())
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_inject_chain_closure, bench_splice_heavy_edit);
criterion_main!(benches);

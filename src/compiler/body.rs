//! Pass 2.

use std::rc::Rc;

use tracing::debug;

use botscript_core::{CompileError, DataType, ReservedBinding};
use botscript_parser::TokenStream;
use botscript_registry::PublicRegistry;

use crate::block::compile_block;
use crate::compiler::signature::parse_header;
use crate::compiler::{CompileEnv, CompileScope, UnitScope};
use crate::function::{FunctionEntity, FunctionSignature};

/// Pass 2: compile the declaration at the stream position into the function
/// `signature` announced in pass 1.
///
/// The header is read again, this time with `public` honoured. A method body
/// sees `this`, `super` when its class has a parent, and every
/// member of its class. A public function is published on success; on error
/// nothing is published and the signature stays with the caller.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile_body(
    stream: &mut TokenStream<'_>,
    env: &CompileEnv<'_>,
    declared: &[FunctionSignature],
    signature: &FunctionSignature,
    public: &mut PublicRegistry<FunctionEntity>,
) -> Result<Rc<FunctionEntity>, CompileError> {
    let header = parse_header(stream, env.classes, signature.class_block.as_deref())?;
    let mut scope = CompileScope::new(header.return_type.clone());

    if let Some(owner) = &header.owner {
        scope.add_reserved(ReservedBinding::CurrentInstance, DataType::class(owner));
        if let Some(parent) = env.classes.parent(owner) {
            scope.add_reserved(ReservedBinding::ParentAlias, DataType::class(parent));
        }
        for member in env.classes.instance_template(owner).unwrap_or_default() {
            scope.add_member(member.name(), member.data_type().clone());
        }
    }
    for param in header.params.iter() {
        scope.add_local(param.name(), param.data_type().clone(), param.span())?;
    }

    let body = {
        let unit = UnitScope {
            env: *env,
            declared,
            public: &*public,
        };
        compile_block(stream, &unit, &mut scope)?
    };

    let function = Rc::new(FunctionEntity::new(
        signature,
        header.flags(true),
        body,
        env.program,
        scope.into_locals(),
    ));
    if function.is_public() {
        public.insert(function.id(), &function);
        debug!(id = %function.id(), name = function.name(), "published");
    }
    Ok(function)
}

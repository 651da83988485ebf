//! Call resolution.
//!
//! Given a name and the types of the provided arguments, pick the function a
//! call site should invoke. A call site that resolved once keeps the identity
//! of its callee and finds it again by identity, without comparing
//! signatures.

mod ranking;

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use botscript_core::{ClassHierarchy, DataType, ErrorCode, FunctionId};

use crate::function::{FunctionEntity, FunctionSignature, ParamList};

pub use ranking::{Score, conversion_cost, score};

/// Anything the resolver can choose between.
pub trait Overload {
    fn function_id(&self) -> FunctionId;
    fn name(&self) -> &str;
    fn params(&self) -> &ParamList;
    fn return_type(&self) -> &DataType;
}

impl Overload for FunctionEntity {
    fn function_id(&self) -> FunctionId {
        self.id()
    }

    fn name(&self) -> &str {
        FunctionEntity::name(self)
    }

    fn params(&self) -> &ParamList {
        FunctionEntity::params(self)
    }

    fn return_type(&self) -> &DataType {
        FunctionEntity::return_type(self)
    }
}

impl Overload for FunctionSignature {
    fn function_id(&self) -> FunctionId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &ParamList {
        &self.params
    }

    fn return_type(&self) -> &DataType {
        &self.return_type
    }
}

impl<T: Overload + ?Sized> Overload for &T {
    fn function_id(&self) -> FunctionId {
        (**self).function_id()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn params(&self) -> &ParamList {
        (**self).params()
    }

    fn return_type(&self) -> &DataType {
        (**self).return_type()
    }
}

impl<T: Overload + ?Sized> Overload for Rc<T> {
    fn function_id(&self) -> FunctionId {
        (**self).function_id()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn params(&self) -> &ParamList {
        (**self).params()
    }

    fn return_type(&self) -> &DataType {
        (**self).return_type()
    }
}

/// Resolves calls against a local chain and, optionally, the public
/// functions.
#[derive(Clone, Copy)]
pub struct CallResolver<'h> {
    hierarchy: &'h dyn ClassHierarchy,
    include_public: bool,
}

impl<'h> CallResolver<'h> {
    pub fn new(hierarchy: &'h dyn ClassHierarchy, include_public: bool) -> Self {
        Self {
            hierarchy,
            include_public,
        }
    }

    /// Find the function `name(args)` should call.
    ///
    /// With an identity in `cached`, the local candidates and then the public
    /// ones are searched for it and a hit is returned as is, whether or not
    /// public functions take part in by-name resolution. Otherwise every
    /// candidate called `name` is scored, local ones first: an exact match is
    /// taken at once, else the lowest distance wins and ties keep the earlier
    /// candidate. The winner's identity is written back to `cached`.
    ///
    /// When nothing fits, the error names the most informative problem: a bad
    /// argument type outranks a wrong count, and a count that was too high
    /// for some candidates and too low for others is ambiguous.
    ///
    /// `local` and `public` produce the candidate sequences; each is walked at
    /// most twice.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve<T, L, P>(
        &self,
        cached: &Cell<Option<FunctionId>>,
        name: &str,
        args: &[DataType],
        local: impl Fn() -> L,
        public: impl Fn() -> P,
    ) -> Result<T, ErrorCode>
    where
        T: Overload,
        L: IntoIterator<Item = T>,
        P: IntoIterator<Item = T>,
    {
        if let Some(id) = cached.get() {
            let hit = local()
                .into_iter()
                .find(|f| f.function_id() == id)
                .or_else(|| public().into_iter().find(|f| f.function_id() == id));
            if let Some(function) = hit {
                return Ok(function);
            }
            debug!(%id, name, "cached callee is gone, resolving by name");
        }

        let public = self.include_public.then(public).into_iter().flatten();

        let mut error = ErrorCode::UndefinedCall;
        let mut best: Option<(T, i32)> = None;

        for candidate in local().into_iter().chain(public) {
            if candidate.name() != name {
                continue;
            }
            let distance = match score(candidate.params().types(), args, self.hierarchy) {
                Score::Distance(distance) => distance,
                Score::Incompatible => {
                    if best.is_none() {
                        error = ErrorCode::BadParameterType;
                    }
                    continue;
                }
                Score::TooMany => {
                    if best.is_none() {
                        error = match error {
                            ErrorCode::TooFewParameters => ErrorCode::AmbiguousParameterCount,
                            ErrorCode::UndefinedCall => ErrorCode::TooManyParameters,
                            other => other,
                        };
                    }
                    continue;
                }
                Score::TooFew => {
                    if best.is_none() {
                        error = match error {
                            ErrorCode::TooManyParameters => ErrorCode::AmbiguousParameterCount,
                            ErrorCode::UndefinedCall => ErrorCode::TooFewParameters,
                            other => other,
                        };
                    }
                    continue;
                }
            };

            if distance == 0 {
                cached.set(Some(candidate.function_id()));
                debug!(name, id = %candidate.function_id(), "exact match");
                return Ok(candidate);
            }
            if best.as_ref().is_none_or(|(_, min)| distance < *min) {
                best = Some((candidate, distance));
            }
        }

        match best {
            Some((function, distance)) => {
                cached.set(Some(function.function_id()));
                debug!(name, id = %function.function_id(), distance, "best match");
                Ok(function)
            }
            None => {
                debug!(name, ?error, "no viable candidate");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botscript_core::ExactClasses;
    use botscript_parser::{TokenStream, tokenize};
    use botscript_registry::ClassRegistry;
    use rstest::rstest;

    fn sig(id: u64, name: &str, params: &str) -> FunctionSignature {
        let tokens = tokenize(params).unwrap();
        let mut stream = TokenStream::new(&tokens);
        FunctionSignature {
            id: FunctionId::new(id),
            name: name.to_string(),
            return_type: DataType::void(),
            params: ParamList::parse(&mut stream, &ClassRegistry::new()).unwrap(),
            flags: Default::default(),
            owner: None,
            class_block: None,
            positions: Default::default(),
            decl_start: 0,
        }
    }

    fn resolve<'a>(
        local: &'a [FunctionSignature],
        public: &'a [FunctionSignature],
        cached: &Cell<Option<FunctionId>>,
        args: &[DataType],
    ) -> Result<&'a FunctionSignature, ErrorCode> {
        CallResolver::new(&ExactClasses, true).resolve(cached, "f", args, || local, || public)
    }

    #[test]
    fn exact_float_overload_wins() {
        let local = [sig(1, "f", "(int a)"), sig(2, "f", "(float a)")];
        let cached = Cell::new(None);
        let f = resolve(&local, &[], &cached, &[DataType::float()]).unwrap();
        assert_eq!(f.id, FunctionId::new(2));
        assert_eq!(cached.get(), Some(FunctionId::new(2)));
    }

    #[test]
    fn widening_beats_narrowing() {
        // (long) needs one widening step from int, (short) one narrowing step.
        let local = [sig(1, "f", "(short a)"), sig(2, "f", "(long a)")];
        let cached = Cell::new(None);
        let f = resolve(&local, &[], &cached, &[DataType::int()]).unwrap();
        assert_eq!(f.id, FunctionId::new(2));
    }

    #[test]
    fn local_tie_beats_public() {
        let local = [sig(1, "f", "(double a)")];
        let public = [sig(2, "f", "(double a)")];
        let cached = Cell::new(None);
        let f = resolve(&local, &public, &cached, &[DataType::int()]).unwrap();
        assert_eq!(f.id, FunctionId::new(1));
    }

    #[test]
    fn cached_identity_short_circuits() {
        let local = [sig(1, "f", "(double a)"), sig(2, "f", "(int a)")];
        let cached = Cell::new(Some(FunctionId::new(1)));
        let f = resolve(&local, &[], &cached, &[DataType::int()]).unwrap();
        assert_eq!(f.id, FunctionId::new(1));
    }

    #[test]
    fn public_only_when_enabled() {
        let public = [sig(7, "f", "()")];
        let cached = Cell::new(None);
        let none: [FunctionSignature; 0] = [];
        let err = CallResolver::new(&ExactClasses, false)
            .resolve(&cached, "f", &[], || &none, || &public)
            .unwrap_err();
        assert_eq!(err, ErrorCode::UndefinedCall);
        assert!(resolve(&none, &public, &cached, &[]).is_ok());
    }

    #[test]
    fn cached_public_identity_found_when_public_disabled() {
        let public = [sig(7, "f", "()")];
        let none: [FunctionSignature; 0] = [];
        let cached = Cell::new(Some(FunctionId::new(7)));
        let f = CallResolver::new(&ExactClasses, false)
            .resolve(&cached, "f", &[], || &none, || &public)
            .unwrap();
        assert_eq!(f.id, FunctionId::new(7));
    }

    #[rstest]
    #[case::unknown(&[], &[DataType::int()], ErrorCode::UndefinedCall)]
    #[case::too_many(&["()"], &[DataType::int()], ErrorCode::TooManyParameters)]
    #[case::too_few(&["(int a, int b)"], &[DataType::int()], ErrorCode::TooFewParameters)]
    #[case::ambiguous(&["()", "(int a, int b)"], &[DataType::int()], ErrorCode::AmbiguousParameterCount)]
    #[case::bad_type(&["(string s)"], &[DataType::int()], ErrorCode::BadParameterType)]
    #[case::bad_type_over_count(&["()", "(string s)"], &[DataType::int()], ErrorCode::BadParameterType)]
    #[case::count_after_bad_type(&["(string s)", "()"], &[DataType::int()], ErrorCode::BadParameterType)]
    fn error_precedence(
        #[case] decls: &[&str],
        #[case] args: &[DataType],
        #[case] expected: ErrorCode,
    ) {
        let local: Vec<_> = decls
            .iter()
            .enumerate()
            .map(|(i, params)| sig(i as u64 + 1, "f", params))
            .collect();
        let cached = Cell::new(None);
        assert_eq!(resolve(&local, &[], &cached, args).unwrap_err(), expected);
        assert_eq!(cached.get(), None);
    }
}

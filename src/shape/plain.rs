use tracing::debug;

use super::{MethodShape, TypeInfo};
use crate::model::{is_exported, Func, Type};

/// The net/rpc convention: exactly `(arg, reply)` where reply is a pointer,
/// returning a single `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl MethodShape for Plain {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn is_suitable(&self, method: &Func) -> bool {
        let name = method.name.as_str();

        if !method.is_exported() {
            debug!(method = name, "Skipping method: unexported");
            return false;
        }

        let params = &method.signature.params;
        if params.len() != 2 {
            debug!(
                method = name,
                found = params.len(),
                "Skipping method: expected 2 params"
            );
            return false;
        }

        let arg = &params[0].ty;
        if !is_exported_or_builtin(arg) {
            debug!(method = name, arg = %arg, "Skipping method: argument type is not exported");
            return false;
        }

        let reply = &params[1].ty;
        if !is_exported_or_builtin(reply) {
            debug!(method = name, reply = %reply, "Skipping method: reply type is not exported");
            return false;
        }

        if !reply.is_pointer() {
            debug!(method = name, reply = %reply, "Skipping method: reply type is not a pointer");
            return false;
        }

        let results = &method.signature.results;
        if results.len() != 1 {
            debug!(
                method = name,
                found = results.len(),
                "Skipping method: expected 1 return value"
            );
            return false;
        }

        if !results[0].ty.is_error() {
            // not fatal, the method is still generated
            debug!(
                method = name,
                found = %results[0].ty,
                "Method does not return `error`"
            );
        }

        true
    }

    fn arg_type(&self, method: &Func) -> Option<TypeInfo> {
        let arg = method.signature.params.first()?;
        Some(TypeInfo::new(arg.ty.strip_pointer().clone()))
    }

    fn reply_type(&self, method: &Func) -> Option<TypeInfo> {
        let reply = method.signature.params.get(1)?;
        Some(TypeInfo::new(reply.ty.strip_pointer().clone()))
    }
}

/// True when a type is primitive or every named type inside it is exported.
///
/// Pointer, slice and array layers are unwrapped first. Both halves of a map
/// must pass since both are needed to spell the type. Array lengths must be
/// literals: a constant like `[N]T` cannot be spelled from the client package.
pub fn is_exported_or_builtin(ty: &Type) -> bool {
    match ty {
        Type::Basic(_) => true,
        Type::Named { name, .. } => is_exported(name),
        Type::Pointer(elem) | Type::Slice(elem) => is_exported_or_builtin(elem),
        Type::Array { len, elem } => is_literal_length(len) && is_exported_or_builtin(elem),
        Type::Map { key, value } => is_exported_or_builtin(key) && is_exported_or_builtin(value),
        Type::Other(_) => false,
    }
}

/// `4`, `0x10` or `1_024`
fn is_literal_length(len: &str) -> bool {
    len.starts_with(|c: char| c.is_ascii_digit())
        && len.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PackageRef;

    fn math() -> PackageRef {
        PackageRef::new("math", "example.com/app/math")
    }

    fn method(params: Vec<Type>, results: Vec<Type>) -> Func {
        Func::method(&math(), "Service", "Sum", params, results)
    }

    #[test]
    fn test_accepts_net_rpc_shape() {
        let m = method(
            vec![
                Type::named("SumArg", &math()),
                Type::pointer(Type::named("SumReply", &math())),
            ],
            vec![Type::error()],
        );
        assert!(Plain.is_suitable(&m));
        assert_eq!(Plain.arg_type(&m).unwrap().identifier, "math.SumArg");
        assert_eq!(Plain.reply_type(&m).unwrap().identifier, "math.SumReply");
    }

    #[test]
    fn test_accepts_primitives() {
        let m = method(
            vec![Type::basic("int"), Type::pointer(Type::basic("int"))],
            vec![Type::error()],
        );
        assert!(Plain.is_suitable(&m));
        assert_eq!(Plain.reply_type(&m).unwrap().identifier, "int");
        assert!(Plain.reply_type(&m).unwrap().imports.is_empty());
    }

    #[test]
    fn test_rejects_wrong_param_count() {
        let int = || Type::pointer(Type::basic("int"));
        for params in [vec![], vec![int()], vec![int(), int(), int()]] {
            assert!(!Plain.is_suitable(&method(params, vec![Type::error()])));
        }
    }

    #[test]
    fn test_rejects_non_pointer_reply() {
        let m = method(
            vec![Type::basic("int"), Type::basic("int")],
            vec![Type::error()],
        );
        assert!(!Plain.is_suitable(&m));

        let slice_reply = method(
            vec![Type::basic("int"), Type::slice(Type::pointer(Type::basic("int")))],
            vec![Type::error()],
        );
        assert!(!Plain.is_suitable(&slice_reply));
    }

    #[test]
    fn test_rejects_unexported_types() {
        let hidden = Type::named("sumArg", &math());
        let arg = method(
            vec![hidden.clone(), Type::pointer(Type::basic("int"))],
            vec![Type::error()],
        );
        assert!(!Plain.is_suitable(&arg));

        let reply = method(
            vec![Type::basic("int"), Type::pointer(Type::slice(hidden))],
            vec![Type::error()],
        );
        assert!(!Plain.is_suitable(&reply));
    }

    #[test]
    fn test_rejects_unexported_method() {
        let mut m = method(
            vec![Type::basic("int"), Type::pointer(Type::basic("int"))],
            vec![Type::error()],
        );
        m.name = "private".to_string();
        assert!(!Plain.is_suitable(&m));
    }

    #[test]
    fn test_map_requires_exported_key_and_value() {
        let exported = Type::named("Item", &math());
        let hidden = Type::named("item", &math());

        assert!(is_exported_or_builtin(&Type::map(Type::basic("string"), exported.clone())));
        assert!(!is_exported_or_builtin(&Type::map(hidden.clone(), exported.clone())));
        assert!(!is_exported_or_builtin(&Type::map(exported, hidden)));
        assert!(!is_exported_or_builtin(&Type::Other("interface{}".to_string())));
        assert!(!is_exported_or_builtin(&Type::error()));
    }

    #[test]
    fn test_array_length_must_be_literal() {
        let array = |len: &str| Type::Array {
            len: len.to_string(),
            elem: Box::new(Type::basic("int")),
        };

        let literal = method(
            vec![array("4"), Type::pointer(array("0x10"))],
            vec![Type::error()],
        );
        assert!(Plain.is_suitable(&literal));
        assert_eq!(Plain.arg_type(&literal).unwrap().identifier, "[4]int");

        let constant = method(
            vec![array("N"), Type::pointer(Type::basic("int"))],
            vec![Type::error()],
        );
        assert!(!Plain.is_suitable(&constant));

        let qualified = method(
            vec![Type::basic("int"), Type::pointer(array("math.Size"))],
            vec![Type::error()],
        );
        assert!(!Plain.is_suitable(&qualified));
    }

    #[test]
    fn test_result_count_and_non_error_result() {
        let params = || vec![Type::basic("int"), Type::pointer(Type::basic("int"))];

        assert!(!Plain.is_suitable(&method(params(), vec![])));
        assert!(!Plain.is_suitable(&method(
            params(),
            vec![Type::basic("int"), Type::error()]
        )));
        // logged only
        assert!(Plain.is_suitable(&method(params(), vec![Type::basic("bool")])));
    }
}

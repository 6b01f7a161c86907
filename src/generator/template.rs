use std::fmt::{self, Write};

use super::resolver::Import;
use super::GeneratedMethod;

/// Input to the client template
#[derive(Debug, Clone)]
pub struct TemplateData {
    /// Name of the output package
    pub package: String,
    /// Name of the service, also the client type name
    pub service: String,
    /// Resolved transport handle type, e.g. `MathCaller` or `*rpc.Client`
    pub transport_type: String,
    /// Interface to declare in the file when the handle is not imported
    pub caller_interface: Option<String>,
    pub imports: Vec<Import>,
    pub methods: Vec<GeneratedMethod>,
}

/// Render the Go client source. The result is canonicalized afterwards.
pub fn render(data: &TemplateData) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let service = &data.service;

    writeln!(out, "// Code generated by rpcglue. DO NOT EDIT.")?;
    writeln!(out)?;
    writeln!(out, "package {}", data.package)?;
    writeln!(out)?;

    if !data.imports.is_empty() {
        writeln!(out, "import (")?;
        for import in &data.imports {
            match &import.alias {
                Some(alias) => writeln!(out, "\t{} \"{}\"", alias, import.path)?,
                None => writeln!(out, "\t\"{}\"", import.path)?,
            }
        }
        writeln!(out, ")")?;
        writeln!(out)?;
    }

    if let Some(caller) = &data.caller_interface {
        writeln!(out, "// {} performs one remote call.", caller)?;
        writeln!(out, "type {} interface {{", caller)?;
        writeln!(
            out,
            "\tCall(serviceMethod string, args interface{{}}, reply interface{{}}) error"
        )?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }

    writeln!(out, "// New{0}Client wraps a transport in a {0} client.", service)?;
    writeln!(
        out,
        "func New{0}Client(rpcClient {1}) *{0} {{",
        service, data.transport_type
    )?;
    writeln!(out, "\tc := new({})", service)?;
    writeln!(out, "\tc.RPC = rpcClient")?;
    writeln!(out, "\treturn c")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "// {0} calls the remote {0} service.", service)?;
    writeln!(out, "type {} struct {{", service)?;
    writeln!(out, "\tRPC {}", data.transport_type)?;
    writeln!(out, "}}")?;

    for method in &data.methods {
        writeln!(out)?;
        writeln!(
            out,
            "func (c *{}) {}(args {}) (*{}, error) {{",
            service, method.name, method.arg_type, method.reply_type
        )?;
        writeln!(out, "\treply := new({})", method.reply_type)?;
        writeln!(
            out,
            "\terr := c.RPC.Call(\"{}.{}\", args, reply)",
            service, method.name
        )?;
        writeln!(out, "\treturn reply, err")?;
        writeln!(out, "}}")?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_method_uses_service_key() {
        let data = TemplateData {
            package: "client".to_string(),
            service: "Math".to_string(),
            transport_type: "*rpc.Client".to_string(),
            caller_interface: None,
            imports: vec![Import {
                alias: Some("math1".to_string()),
                path: "example.com/app/math".to_string(),
            }],
            methods: vec![GeneratedMethod {
                name: "Sum".to_string(),
                arg_type: "math1.SumArg".to_string(),
                reply_type: "math1.SumReply".to_string(),
            }],
        };

        let out = render(&data).unwrap();
        assert!(out.contains("\tmath1 \"example.com/app/math\"\n"));
        assert!(out.contains("func NewMathClient(rpcClient *rpc.Client) *Math {"));
        assert!(out.contains("func (c *Math) Sum(args math1.SumArg) (*math1.SumReply, error) {"));
        assert!(out.contains("\treply := new(math1.SumReply)\n"));
        assert!(out.contains("c.RPC.Call(\"Math.Sum\", args, reply)"));
        assert!(!out.contains("interface"));
    }

    #[test]
    fn test_render_declares_caller_interface() {
        let data = TemplateData {
            package: "client".to_string(),
            service: "Math".to_string(),
            transport_type: "MathCaller".to_string(),
            caller_interface: Some("MathCaller".to_string()),
            imports: Vec::new(),
            methods: Vec::new(),
        };

        let out = render(&data).unwrap();
        assert!(out.contains(
            "type MathCaller interface {\n\tCall(serviceMethod string, args interface{}, reply interface{}) error\n}\n"
        ));
        assert!(out.contains("func NewMathClient(rpcClient MathCaller) *Math {"));
        assert!(!out.contains("import"));
    }
}

use super::parse_args;
use crate::cli::CallArgs;

use anyhow::Result;
use rwamp::{Dict, Session};
use serde_json::Value;

pub async fn call(session: &Session, args: &CallArgs) -> Result<()> {
  let result = session.call(&args.procedure, parse_args(&args.args), Dict::new()).await?;
  match (result.args.len(), result.kwargs.is_empty()) {
    (0, true) => {}
    (1, true) => println!("{}", result.args[0]),
    _ => {
      let mut out = Dict::new();
      out.insert("args".into(), Value::Array(result.args));
      out.insert("kwargs".into(), Value::Object(result.kwargs));
      println!("{}", serde_json::to_string_pretty(&out)?);
    }
  }
  Ok(())
}

use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_lambda as lambda;
use serde_json::{json, Map as JsonMap, Value};

use super::ApiCall;

pub struct ListFunctions;

#[async_trait]
impl ApiCall for ListFunctions {
    async fn fetch_pages(&self, conf: &SdkConfig) -> Result<Vec<Value>> {
        let client = lambda::Client::new(conf);
        let mut pages = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut req = client.list_functions();
            if let Some(m) = marker.as_deref() {
                req = req.marker(m);
            }
            let resp = req.send().await?;

            let mut items = Vec::new();
            for f in resp.functions() {
                let mut m = JsonMap::new();
                if let Some(name) = f.function_name() {
                    m.insert("FunctionName".into(), json!(name));
                }
                if let Some(arn) = f.function_arn() {
                    m.insert("FunctionArn".into(), json!(arn));
                }
                if let Some(state) = f.state() {
                    m.insert("State".into(), json!(state.as_str()));
                }
                if let Some(runtime) = f.runtime() {
                    m.insert("Runtime".into(), json!(runtime.as_str()));
                }
                if let Some(handler) = f.handler() {
                    m.insert("Handler".into(), json!(handler));
                }
                m.insert("MemorySize".into(), json!(f.memory_size()));
                if let Some(modified) = f.last_modified() {
                    m.insert("LastModified".into(), json!(modified));
                }
                items.push(Value::Object(m));
            }
            pages.push(json!({ "Functions": items }));

            marker = resp.next_marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(pages)
    }
}

// ABOUTME: get_stations_info - lists hydrology stations in a province,
// ABOUTME: following every page, narrowed by station name.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::matching::{resolve_name, retain_named};
use super::{HydroApi, nullable, supplied};
use crate::tool::{Arguments, ParamSpec, Tool, ToolOutput};

pub struct StationsTool {
    api: Arc<HydroApi>,
}

impl StationsTool {
    pub fn new(api: Arc<HydroApi>) -> Self {
        Self { api }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    province: String,
    #[serde(deserialize_with = "nullable")]
    station_name: Option<String>,
}

#[async_trait]
impl Tool for StationsTool {
    fn name(&self) -> &str {
        "get_stations_info"
    }

    fn description(&self) -> &str {
        "根据行政区和站名查询水文站点的基本信息。"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("province", "str", "行政区"),
            ParamSpec::required("station_name", "str", "站点的名字"),
        ]
    }

    async fn call(&self, args: Arguments) -> Result<ToolOutput, anyhow::Error> {
        let params: Params = serde_json::from_value(Value::Object(args))?;
        let mut records = self.api.stations(&params.province).await?;

        let station = resolve_name(&records, "站名", supplied(params.station_name).as_deref());
        retain_named(&mut records, "站名", station.as_deref());

        tracing::info!(
            province = %params.province,
            station = ?station,
            matches = records.len(),
            "stations lookup"
        );
        Ok(ToolOutput::json(records)?)
    }
}

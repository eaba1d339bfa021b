//! 配置校验模块
//!
//! 校验规则：
//! - 字段级约束 (validator derive)
//! - receiver 名称唯一，且至少绑定一个 sink
//! - 路由引用的 receiver 必须存在
//! - 谓词 value / pattern 二选一，正则可编译
//! - 模板可编译

use std::collections::HashSet;

use contracts::{
    ContractError, ExporterConfig, PredicateConfig, ReceiverConfig, RouteConfig,
    SinkConfig,
};
use template::Template;
use validator::Validate;

/// 校验 ExporterConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ExporterConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_receiver_names(&config.receivers)?;
    validate_sinks(&config.receivers)?;
    validate_route(&config.route, "route", &receiver_names(&config.receivers))?;
    Ok(())
}

/// 字段级约束
fn validate_fields(config: &ExporterConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))
}

fn receiver_names(receivers: &[ReceiverConfig]) -> HashSet<&str> {
    receivers.iter().map(|r| r.name.as_str()).collect()
}

/// 校验 receiver 名称唯一性
fn validate_receiver_names(receivers: &[ReceiverConfig]) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for receiver in receivers {
        if !seen.insert(receiver.name.as_str()) {
            return Err(ContractError::DuplicateReceiver {
                name: receiver.name.clone(),
            });
        }
    }
    Ok(())
}

/// 校验 sink 配置与模板
fn validate_sinks(receivers: &[ReceiverConfig]) -> Result<(), ContractError> {
    for receiver in receivers {
        if receiver.sinks.is_empty() {
            return Err(ContractError::config_validation(
                format!("receivers.{}.sinks", receiver.name),
                "receiver must have at least one sink",
            ));
        }

        for (idx, sink) in receiver.sinks.iter().enumerate() {
            let location = format!("receivers.{}.sinks[{idx}]", receiver.name);

            let fields = match sink {
                SinkConfig::Stdout(_) => Ok(()),
                SinkConfig::Syslog(c) => c.validate(),
                SinkConfig::EventBridge(c) => c.validate(),
            };
            fields.map_err(|e| ContractError::config_validation(&location, e.to_string()))?;

            if let Some(layout) = sink.layout() {
                Template::compile(layout, &location)?;
            }
        }
    }
    Ok(())
}

/// 递归校验路由树
fn validate_route(
    route: &RouteConfig,
    label: &str,
    known: &HashSet<&str>,
) -> Result<(), ContractError> {
    for name in &route.receivers {
        if !known.contains(name.as_str()) {
            return Err(ContractError::UnknownReceiver {
                route: label.to_string(),
                name: name.clone(),
            });
        }
    }

    for (idx, predicate) in route.drop.iter().enumerate() {
        validate_predicate(predicate, &format!("{label}.drop[{idx}]"))?;
    }
    for (idx, predicate) in route.matches.iter().enumerate() {
        validate_predicate(predicate, &format!("{label}.match[{idx}]"))?;
    }
    for (idx, child) in route.routes.iter().enumerate() {
        validate_route(child, &format!("{label}.routes[{idx}]"), known)?;
    }
    Ok(())
}

fn validate_predicate(predicate: &PredicateConfig, location: &str) -> Result<(), ContractError> {
    predicate.compile(location).map(drop)
}

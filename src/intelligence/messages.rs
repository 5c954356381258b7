//! Localized alert titles and messages.
//!
//! Templates are keyed by rule code and use `{name}` placeholders. A key
//! with no template renders through the generic template. A template
//! whose placeholders cannot all be resolved is returned unformatted.

use crate::config::Locale;

/// (title, message) templates for one rule.
type Template = (&'static str, &'static str);

const GENERIC_EN: Template = ("Health alert", "A health check flagged \"{rule}\" for review.");
const GENERIC_ZH: Template = ("健康提醒", "健康检查标记了“{rule}”，请查看。");

fn template_en(key: &str) -> Option<Template> {
    Some(match key {
        "bp_sustained_high" => (
            "Sustained high blood pressure",
            "{count} of {total} readings reached 140 mmHg systolic; mean systolic {mean} mmHg.",
        ),
        "bp_critical" => (
            "Blood pressure critically high",
            "Reading of {systolic}/{diastolic} mmHg is above the critical range.",
        ),
        "bp_high" => (
            "Blood pressure high",
            "Reading of {systolic}/{diastolic} mmHg is above the high range.",
        ),
        "bp_physiological_error" => (
            "Implausible blood pressure reading",
            "Systolic {systolic} is not above diastolic {diastolic}. Please recheck the measurement.",
        ),
        "glucose_high_rising" => (
            "Glucose high and rising",
            "Mean glucose {mean} mmol/L over {count} readings, rising from {first} to {last}.",
        ),
        "glucose_high_falling" => (
            "Glucose high but falling",
            "Mean glucose {mean} mmol/L over {count} readings, falling from {first} to {last}.",
        ),
        "glucose_high_stable" => (
            "Glucose persistently high",
            "Mean glucose {mean} mmol/L over {count} readings without improvement.",
        ),
        "glucose_normal_rising" => (
            "Glucose rising",
            "Glucose is within range (mean {mean} mmol/L) but rising from {first} to {last}.",
        ),
        "glucose_critical" => (
            "Glucose critically high",
            "Reading of {value} mmol/L is above the critical range.",
        ),
        "glucose_high" => ("Glucose high", "Reading of {value} mmol/L is above the high range."),
        "glucose_low" => ("Glucose low", "Reading of {value} mmol/L is below the safe range."),
        "heart_rate_elevated" => (
            "Elevated heart rate",
            "{count} readings above 100 bpm in the window; latest {value} bpm.",
        ),
        "heart_rate_critical" => (
            "Heart rate critically high",
            "Reading of {value} bpm is above the critical range.",
        ),
        "heart_rate_high" => ("Heart rate high", "Reading of {value} bpm is above the high range."),
        "heart_rate_low" => ("Heart rate low", "Reading of {value} bpm is below the normal range."),
        "weight_rapid_change" => (
            "Rapid weight change",
            "Weight moved from {first} kg to {last} kg ({slope} kg per reading).",
        ),
        "threshold_danger" => (
            "Danger threshold exceeded",
            "Latest {metric} reading of {value} {unit} is outside the danger bounds.",
        ),
        "threshold_warning" => (
            "Warning threshold exceeded",
            "Latest {metric} reading of {value} {unit} is outside the warning bounds.",
        ),
        "historical_deviation" => (
            "Unusual reading",
            "{metric} reading of {value} deviates from the 7-day mean {mean} (z = {z}).",
        ),
        "medication_adherence" => (
            "Medication adherence low",
            "{plans} medication plan(s) need attention; longest missed streak {streak}. {details}",
        ),
        "low_engagement" => (
            "Low engagement",
            "{actual} of {expected} expected records over {days} days ({ratio}).",
        ),
        "cardiovascular_regulation" => (
            "Blood pressure and heart rate mismatch",
            "High blood pressure {systolic}/{diastolic} mmHg with heart rate {heart_rate} bpm.",
        ),
        "glucose_weight_loss" => (
            "High glucose with low weight",
            "Glucose {glucose} mmol/L with body weight {weight} kg.",
        ),
        "system_notice" => ("System notice", "{detail}"),
        _ => return None,
    })
}

fn template_zh(key: &str) -> Option<Template> {
    Some(match key {
        "bp_sustained_high" => (
            "血压持续偏高",
            "{total} 次测量中有 {count} 次收缩压达到 140 mmHg，平均收缩压 {mean} mmHg。",
        ),
        "bp_critical" => ("血压危急", "测量值 {systolic}/{diastolic} mmHg 高于危急范围。"),
        "bp_high" => ("血压偏高", "测量值 {systolic}/{diastolic} mmHg 高于偏高范围。"),
        "bp_physiological_error" => (
            "血压读数异常",
            "收缩压 {systolic} 不高于舒张压 {diastolic}，请重新测量。",
        ),
        "glucose_high_rising" => (
            "血糖偏高且上升",
            "{count} 次测量平均血糖 {mean} mmol/L，由 {first} 升至 {last}。",
        ),
        "glucose_high_falling" => (
            "血糖偏高但下降",
            "{count} 次测量平均血糖 {mean} mmol/L，由 {first} 降至 {last}。",
        ),
        "glucose_high_stable" => ("血糖持续偏高", "{count} 次测量平均血糖 {mean} mmol/L，未见改善。"),
        "glucose_normal_rising" => (
            "血糖上升",
            "血糖在正常范围内（平均 {mean} mmol/L），但由 {first} 升至 {last}。",
        ),
        "glucose_critical" => ("血糖危急", "测量值 {value} mmol/L 高于危急范围。"),
        "glucose_high" => ("血糖偏高", "测量值 {value} mmol/L 高于偏高范围。"),
        "glucose_low" => ("血糖偏低", "测量值 {value} mmol/L 低于安全范围。"),
        "heart_rate_elevated" => ("心率偏快", "窗口内 {count} 次心率超过 100 次/分，最近一次 {value} 次/分。"),
        "heart_rate_critical" => ("心率危急", "测量值 {value} 次/分高于危急范围。"),
        "heart_rate_high" => ("心率偏快", "测量值 {value} 次/分高于偏高范围。"),
        "heart_rate_low" => ("心率偏慢", "测量值 {value} 次/分低于正常范围。"),
        "weight_rapid_change" => ("体重变化过快", "体重由 {first} kg 变为 {last} kg（每次 {slope} kg）。"),
        "threshold_danger" => ("超出危险阈值", "最新 {metric} 测量值 {value} {unit} 超出危险范围。"),
        "threshold_warning" => ("超出警告阈值", "最新 {metric} 测量值 {value} {unit} 超出警告范围。"),
        "historical_deviation" => (
            "读数异常波动",
            "{metric} 测量值 {value} 偏离 7 日均值 {mean}（z = {z}）。",
        ),
        "medication_adherence" => (
            "用药依从性低",
            "{plans} 个用药计划需要关注，最长连续漏服 {streak} 次。{details}",
        ),
        "low_engagement" => ("活跃度低", "{days} 天内仅有 {actual} 条记录，预期 {expected} 条（{ratio}）。"),
        "cardiovascular_regulation" => (
            "血压与心率不匹配",
            "血压偏高 {systolic}/{diastolic} mmHg，心率 {heart_rate} 次/分。",
        ),
        "glucose_weight_loss" => ("血糖高且体重低", "血糖 {glucose} mmol/L，体重 {weight} kg。"),
        "system_notice" => ("系统通知", "{detail}"),
        _ => return None,
    })
}

/// Substitute `{name}` placeholders. `None` if any placeholder has no value
/// or a brace is left unbalanced.
pub fn fill(template: &str, vars: &[(&str, String)]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        let name = &after[..end];
        let (_, value) = vars.iter().find(|(k, _)| *k == name)?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

fn fill_or_raw(template: &str, vars: &[(&str, String)]) -> String {
    fill(template, vars).unwrap_or_else(|| template.to_string())
}

/// Render (title, message) for `key` in `locale`.
pub fn render(locale: Locale, key: &str, vars: &[(&str, String)]) -> (String, String) {
    let found = match locale {
        Locale::Zh => template_zh(key),
        Locale::En => template_en(key),
    };
    match found {
        Some((title, message)) => (fill_or_raw(title, vars), fill_or_raw(message, vars)),
        None => {
            let (title, message) = match locale {
                Locale::Zh => GENERIC_ZH,
                Locale::En => GENERIC_EN,
            };
            let mut generic_vars: Vec<(&str, String)> = vars.to_vec();
            generic_vars.push(("rule", key.to_string()));
            (fill_or_raw(title, &generic_vars), fill_or_raw(message, &generic_vars))
        }
    }
}

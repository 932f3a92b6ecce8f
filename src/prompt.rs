// ABOUTME: Structured prompt configuration and deterministic system instruction assembly
// ABOUTME: Holds the currently active instruction behind an atomic swap for chat requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Prompt Assembler
//!
//! The prompt editor saves a structured [`PromptConfig`] document. This
//! module turns such a document into the single system instruction string
//! handed to the LLM, in a fixed section order so the same configuration
//! always produces byte-identical output.
//!
//! The instruction assembled from the active version lives in
//! [`ActivePrompt`]; activation swaps the whole string at once, so a chat
//! request in flight sees either the previous or the new complete
//! instruction, never a mixture.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::errors::{AppError, AppResult};

/// Persona and tone settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotPersonality {
    pub role_description: String,
    pub communication_principles: String,
}

/// Guardrails for off-topic or inappropriate questions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotControl {
    pub inappropriate_question_response: String,
    pub negative_prompt: String,
}

/// Company facts surfaced to the model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyInfo {
    pub company_name: String,
    pub location: String,
    pub phone: String,
    pub business_hours: String,
    pub holidays: String,
    pub appeal_points: String,
    pub campaign_info: String,
}

/// Curated question/answer pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QnaSection {
    pub qna_content: String,
}

/// URLs the model may point customers to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSet {
    pub link_instagram: String,
    pub link_line: String,
    pub link_zil: String,
    pub link_crea: String,
    pub link_news: String,
    pub link_pricing: String,
    pub link_booking: String,
    #[serde(rename = "link_checkoutFlow")]
    pub link_checkout_flow: String,
    #[serde(rename = "link_checkinFlow")]
    pub link_checkin_flow: String,
    #[serde(rename = "link_accidentResponse")]
    pub link_accident_response: String,
    pub link_terms: String,
    pub link_privacy: String,
    pub link_carstay: String,
    pub link_other1: String,
    pub link_other2: String,
    pub link_other3: String,
    pub link_other4: String,
    pub link_other5: String,
}

/// Features of the ZIL vehicle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleZil {
    pub vehicle_zil_features: String,
}

/// Features of the CREA vehicle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleCrea {
    pub vehicle_crea_features: String,
}

/// Equipment shared across the fleet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleCommon {
    pub common_equipment: String,
    pub other_equipment: String,
}

/// Pricing rules and payment terms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingSection {
    pub pricing_notes: String,
    pub long_term_discounts: String,
    pub cancellation_policy: String,
    pub payment_methods: String,
}

/// Rental procedures from checkout to accident handling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProceduresSection {
    pub checkout_flow: String,
    pub checkin_flow: String,
    pub usage_manners: String,
    pub prohibited_items: String,
    pub accident_response: String,
}

/// Terms of service and privacy policy text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoliciesSection {
    pub terms_content: String,
    pub privacy_policy_content: String,
}

/// Packing suggestions for customers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreparationSection {
    pub essential_items: String,
    pub convenient_items: String,
}

/// Trip recommendations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationsSection {
    pub overnight_spots: String,
}

/// Anything that fits nowhere else
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OtherSection {
    pub other_info: String,
}

/// The full structured configuration saved by the prompt editor
///
/// Every group and field is optional in the stored JSON; missing pieces
/// deserialize to empty strings and simply drop out of the assembled text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub bot_personality: BotPersonality,
    pub bot_control: BotControl,
    pub company_info: CompanyInfo,
    pub qna: QnaSection,
    pub links: LinkSet,
    pub vehicle_zil: VehicleZil,
    pub vehicle_crea: VehicleCrea,
    pub vehicle_common: VehicleCommon,
    pub pricing: PricingSection,
    pub procedures: ProceduresSection,
    pub policies: PoliciesSection,
    pub preparation: PreparationSection,
    pub recommendations: RecommendationsSection,
    pub other: OtherSection,
}

/// Assemble the system instruction text from a configuration
///
/// Deterministic: the same configuration always yields the same string.
/// A section whose fields are all empty is omitted entirely.
#[must_use]
pub fn assemble(config: &PromptConfig) -> String {
    let mut out = String::new();

    push_section(
        &mut out,
        "あなたの役割",
        &[
            ("", &config.bot_personality.role_description),
            ("応対の原則", &config.bot_personality.communication_principles),
        ],
    );

    push_section(&mut out, "よくある質問と回答", &[("", &config.qna.qna_content)]);

    push_section(
        &mut out,
        "会社情報",
        &[
            ("会社名", &config.company_info.company_name),
            ("所在地", &config.company_info.location),
            ("電話番号", &config.company_info.phone),
            ("営業時間", &config.company_info.business_hours),
            ("定休日", &config.company_info.holidays),
            ("アピールポイント", &config.company_info.appeal_points),
            ("キャンペーン情報", &config.company_info.campaign_info),
        ],
    );

    push_links(&mut out, &config.links);

    push_section(
        &mut out,
        "車両情報",
        &[
            ("ZILの特徴", &config.vehicle_zil.vehicle_zil_features),
            ("CREAの特徴", &config.vehicle_crea.vehicle_crea_features),
            ("共通装備", &config.vehicle_common.common_equipment),
            ("その他の装備", &config.vehicle_common.other_equipment),
        ],
    );

    push_section(
        &mut out,
        "料金について",
        &[
            ("料金に関する注意事項", &config.pricing.pricing_notes),
            ("長期割引", &config.pricing.long_term_discounts),
            ("キャンセルポリシー", &config.pricing.cancellation_policy),
            ("お支払い方法", &config.pricing.payment_methods),
        ],
    );

    push_section(
        &mut out,
        "ご利用の流れ",
        &[
            ("出発手続き", &config.procedures.checkout_flow),
            ("返却手続き", &config.procedures.checkin_flow),
            ("利用マナー", &config.procedures.usage_manners),
            ("禁止事項", &config.procedures.prohibited_items),
            ("事故時の対応", &config.procedures.accident_response),
        ],
    );

    push_section(
        &mut out,
        "規約",
        &[
            ("利用規約", &config.policies.terms_content),
            ("プライバシーポリシー", &config.policies.privacy_policy_content),
        ],
    );

    push_section(
        &mut out,
        "ご旅行の準備",
        &[
            ("必需品", &config.preparation.essential_items),
            ("あると便利なもの", &config.preparation.convenient_items),
        ],
    );

    push_section(
        &mut out,
        "おすすめ情報",
        &[("車中泊スポット", &config.recommendations.overnight_spots)],
    );

    push_section(
        &mut out,
        "回答時の制約",
        &[
            (
                "不適切な質問への応答",
                &config.bot_control.inappropriate_question_response,
            ),
            ("禁止される回答", &config.bot_control.negative_prompt),
        ],
    );

    push_section(&mut out, "その他", &[("", &config.other.other_info)]);

    out.trim_end().to_owned()
}

/// Append one titled section, skipping it when every field is empty
fn push_section(out: &mut String, title: &str, fields: &[(&str, &str)]) {
    if fields.iter().all(|(_, value)| value.trim().is_empty()) {
        return;
    }

    out.push_str("## ");
    out.push_str(title);
    out.push('\n');

    for (label, value) in fields {
        if value.trim().is_empty() {
            continue;
        }
        if label.is_empty() {
            out.push_str(value.trim());
        } else {
            out.push_str("### ");
            out.push_str(label);
            out.push('\n');
            out.push_str(value.trim());
        }
        out.push('\n');
    }
    out.push('\n');
}

/// Append the link section as a markdown list
fn push_links(out: &mut String, links: &LinkSet) {
    let entries: [(&str, &str); 18] = [
        ("Instagram", &links.link_instagram),
        ("LINE公式アカウント", &links.link_line),
        ("ZIL車両紹介", &links.link_zil),
        ("CREA車両紹介", &links.link_crea),
        ("お知らせ", &links.link_news),
        ("料金案内", &links.link_pricing),
        ("ご予約", &links.link_booking),
        ("出発手続きのご案内", &links.link_checkout_flow),
        ("返却手続きのご案内", &links.link_checkin_flow),
        ("事故時の対応のご案内", &links.link_accident_response),
        ("利用規約", &links.link_terms),
        ("プライバシーポリシー", &links.link_privacy),
        ("Carstay掲載ページ", &links.link_carstay),
        ("その他1", &links.link_other1),
        ("その他2", &links.link_other2),
        ("その他3", &links.link_other3),
        ("その他4", &links.link_other4),
        ("その他5", &links.link_other5),
    ];

    if entries.iter().all(|(_, url)| url.trim().is_empty()) {
        return;
    }

    out.push_str("## 案内用リンク\n");
    for (label, url) in entries {
        if url.trim().is_empty() {
            continue;
        }
        out.push_str("- [");
        out.push_str(label);
        out.push_str("](");
        out.push_str(url.trim());
        out.push_str(")\n");
    }
    out.push('\n');
}

/// The currently active system instruction, swapped whole on activation
#[derive(Debug, Default)]
pub struct ActivePrompt {
    current: RwLock<Option<Arc<str>>>,
}

impl ActivePrompt {
    /// Create an empty holder with no active instruction yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active instruction with a freshly assembled one
    pub async fn swap(&self, instruction: String) {
        let mut guard = self.current.write().await;
        *guard = Some(Arc::from(instruction));
    }

    /// Get the active instruction, or `ConfigMissing` when none was activated
    pub async fn get(&self) -> AppResult<Arc<str>> {
        self.current.read().await.clone().ok_or_else(|| {
            AppError::config_missing("No active prompt version has been configured")
        })
    }

    /// Whether an instruction has been activated
    pub async fn is_configured(&self) -> bool {
        self.current.read().await.is_some()
    }
}

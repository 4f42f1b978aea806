//! Collect-and-analyze: forward the collected news to the language model.
//!
//! The whole result list goes out in a single request, whether or not some
//! courts failed. The reply is parsed leniently: the requested record array
//! if it matches, any JSON otherwise, and the raw text when it is not JSON
//! at all. A failed chat call is returned to the caller as an error.

use crate::api::{ChatCompletion, ChatError, ChatRequest};
use crate::collect::Collector;
use crate::fetch::PageFetcher;
use crate::models::{Analysis, AnalysisRecord, AnalysisReport};
use crate::utils::{looks_truncated, truncate_for_log};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Instruction sent with every analysis request.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"Você atua como um Analista de Monitoramento de Sistemas e Engenheiro de Automação.

Sua tarefa é analisar um array de objetos JSON contendo as últimas notícias extraídas de portais de diversos Tribunais (sources). Seu objetivo principal é identificar qualquer notícia que indique mudanças iminentes ou recém-aplicadas nos sistemas dos tribunais que possam impactar automações, robôs (scrapers) e integrações via API.

**CRITÉRIOS DE BUSCA (O QUE PROCURAR):**
Analise os campos "heading" e "summary" buscando alertas sobre:
- Implementação de novos sistemas de segurança (Captchas, Cloudflare, bloqueios de IP).
- Restrições de acesso, limites de requisições ou políticas anti-robôs/anti-scraping.
- Atualizações profundas de sistema (ex: migração para PJe, e-SAJ, Projudi).
- Indisponibilidades programadas, manutenção de servidores ou mudanças de infraestrutura.
- Mudanças drásticas de layout ou na forma de login/autenticação dos usuários.

**FORMATO DE SAÍDA OBRIGATÓRIO:**
Você deve retornar EXCLUSIVAMENTE um array de objetos em formato JSON válido. Não inclua textos antes ou depois do JSON. Para CADA tribunal (source) presente na entrada, gere um objeto contendo exatamente as seguintes chaves:

- "source": O nome do tribunal analisado (ex: "TJ-MG").
- "fonte_verificada_integralmente_nesta_data": Booleano (true/false). Retorne true se a fonte enviou dados (mesmo que um array vazio de notícias, o que indica que a fonte foi checada mas não havia publicações) e o processamento ocorreu sem erros.
- "mudanca_relevante_mapeada": Booleano (true/false). Retorne true APENAS se alguma notícia se enquadrar nos critérios de busca acima. Caso contrário, false.
- "noticias_preocupantes": Um array contendo os objetos originais exatos das notícias que dispararam o alerta. Se nenhuma notícia for preocupante, retorne um array vazio [].
- "justificativa_e_impacto": String. Se "mudanca_relevante_mapeada" for true, escreva um parágrafo analítico explicando qual foi a mudança encontrada e por que ela preocupa/impacta sistemas de automação. Se for false, retorne null ou string vazia ""."#;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Chat(#[from] ChatError),
    #[error("failed to serialize collected news: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Interpret the model's reply without ever failing.
pub fn parse_analysis(content: &str) -> Analysis {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => match serde_json::from_value::<Vec<AnalysisRecord>>(value.clone()) {
            Ok(records) => Analysis::Records(records),
            Err(e) => {
                warn!(error = %e, "Model JSON does not match the record shape; passing it through");
                Analysis::Json(value)
            }
        },
        Err(e) => {
            warn!(
                error = %e,
                truncated = looks_truncated(&e),
                response_preview = %truncate_for_log(content, 300),
                "Model response is not valid JSON; returning it as text"
            );
            Analysis::Raw(content.to_string())
        }
    }
}

/// Collect every court, then ask the model to flag relevant changes.
#[instrument(level = "info", skip_all)]
pub async fn collect_and_analyze<F, C>(
    collector: &Collector<'_, F>,
    chat: &C,
) -> Result<AnalysisReport, AnalysisError>
where
    F: PageFetcher,
    C: ChatCompletion,
{
    let outcome = collector.collect_all().await;
    let payload = serde_json::to_string(&outcome.results)?;

    info!(
        sources = outcome.results.len(),
        warnings = outcome.warnings.len(),
        bytes = payload.len(),
        "Sending collected news for analysis"
    );
    let response = chat
        .chat(ChatRequest {
            system_prompt: ANALYSIS_SYSTEM_PROMPT,
            user_message: &payload,
        })
        .await?;

    let analysis = parse_analysis(&response.content);
    info!(
        structured = matches!(analysis, Analysis::Records(_)),
        total_tokens = response.usage.total_tokens,
        "Analysis complete"
    );

    Ok(AnalysisReport {
        analysis,
        warnings: outcome.warnings,
        usage: response.usage,
    })
}

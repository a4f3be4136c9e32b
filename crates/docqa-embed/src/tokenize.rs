use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Tokenizer};

/// Model inputs for a single sequence, each shaped `[1, T]`.
pub struct Encoded {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Tokenize a text or a (query, passage) pair, truncated to `max_len` tokens.
/// No padding: every sequence is run on its own.
pub fn tokenize_on_device<'s, E>(tokenizer: &Tokenizer, input: E, max_len: usize, device: &Device) -> Result<Encoded>
where
    E: Into<EncodeInput<'s>>,
{
    let enc = tokenizer.encode(input, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let len = enc.get_ids().len().min(max_len);
    let ids = &enc.get_ids()[..len];
    let type_ids = &enc.get_type_ids()[..len];
    let mask = &enc.get_attention_mask()[..len];

    Ok(Encoded {
        input_ids: Tensor::new(ids, device)?.unsqueeze(0)?,
        token_type_ids: Tensor::new(type_ids, device)?.unsqueeze(0)?,
        attention_mask: Tensor::new(mask, device)?.unsqueeze(0)?,
    })
}

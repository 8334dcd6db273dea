use alloy::sol;

sol!(
    #[allow(missing_docs)]
    ChatGPTInfoStore,
    "abi/ChatGPTInfoStore.json"
);
